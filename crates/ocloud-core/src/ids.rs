//! Core identifier types.
//!
//! Every server-assigned identifier is a random UUID v4. IDs serialize as their
//! hyphenated string form so they can be embedded directly in JSON payloads and
//! URL paths.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(uuid::Uuid);

        impl $name {
            /// Create the identifier from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            /// Generate a new random identifier.
            #[must_use]
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4())
            }

            /// Return the underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> &uuid::Uuid {
                &self.0
            }

            /// Return the bytes of the UUID.
            #[must_use]
            pub fn as_bytes(&self) -> &[u8; 16] {
                self.0.as_bytes()
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid = uuid::Uuid::parse_str(s).map_err(|_| IdError::InvalidUuid)?;
                Ok(Self(uuid))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0.to_string()
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                self.0.as_bytes()
            }
        }
    };
}

uuid_id!(
    /// Identifier of a committed capacity grant from a resource pool.
    AllocationId
);

uuid_id!(
    /// Identifier of a resource pool exposed through the O2 API.
    ResourcePoolId
);

uuid_id!(
    /// Identifier of an O2 resource.
    ResourceId
);

uuid_id!(
    /// Identifier of an O2 deployment.
    DeploymentId
);

uuid_id!(
    /// Identifier of an alarm.
    AlarmId
);

uuid_id!(
    /// Identifier of an O2 event subscription.
    SubscriptionId
);

uuid_id!(
    /// Identifier threaded through one reconcile cycle or orchestration workflow.
    ///
    /// Every log line and error produced by that unit of work carries it.
    CorrelationId
);

/// Errors that can occur when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The input is not a valid UUID.
    #[error("invalid UUID format")]
    InvalidUuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_id_roundtrip() {
        let id = AllocationId::generate();
        let parsed = AllocationId::from_str(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn generated_ids_are_unique() {
        let ids: std::collections::HashSet<_> =
            (0..1000).map(|_| ResourceId::generate()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn invalid_uuid_rejected() {
        let result = DeploymentId::from_str("dep-1700000000");
        assert!(matches!(result, Err(IdError::InvalidUuid)));
    }

    #[test]
    fn serializes_as_plain_string() {
        let uuid = uuid::Uuid::new_v4();
        let id = AlarmId::from_uuid(uuid);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{uuid}\""));

        let parsed: AlarmId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn deserialize_rejects_garbage() {
        let result: Result<SubscriptionId, _> = serde_json::from_str("\"sub-1\"");
        assert!(result.is_err());
    }

    #[test]
    fn debug_includes_type_name() {
        let id = CorrelationId::generate();
        assert!(format!("{id:?}").starts_with("CorrelationId("));
    }
}
