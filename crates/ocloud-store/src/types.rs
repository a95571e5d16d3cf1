//! Domain types stored in the database.
//!
//! An [`OCloud`] is the declarative root object: operators write its spec, the
//! reconciler writes its status. Field names serialize in camelCase so the
//! persisted JSON matches what SMO consumers and the management API exchange.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A managed O-Cloud instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OCloud {
    /// Unique name, also the storage key.
    pub name: String,
    /// Desired state.
    pub spec: OCloudSpec,
    /// Observed state, written only by the reconciler.
    #[serde(default)]
    pub status: OCloudStatus,
}

impl OCloud {
    /// Create an O-Cloud with an empty status.
    #[must_use]
    pub fn new(name: impl Into<String>, spec: OCloudSpec) -> Self {
        Self {
            name: name.into(),
            spec,
            status: OCloudStatus::default(),
        }
    }
}

/// Desired state of an O-Cloud.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OCloudSpec {
    /// Upstream SMO registration settings.
    #[serde(default)]
    pub smo: SmoConfig,
    /// Capacity envelopes to manage.
    #[serde(default)]
    pub resource_pools: Vec<ResourcePoolSpec>,
    /// O2 IMS API settings.
    #[serde(default)]
    pub o2_interface: O2InterfaceConfig,
    /// Infrastructure flavour, e.g. `kubernetes` or `openstack`.
    #[serde(default)]
    pub infrastructure_type: String,
    /// Regions this O-Cloud serves.
    #[serde(default)]
    pub regions: Vec<String>,
}

/// SMO connection settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmoConfig {
    /// Whether the O-Cloud registers with an SMO at all.
    #[serde(default)]
    pub enabled: bool,
    /// Base URL of the SMO.
    #[serde(default)]
    pub endpoint: String,
    /// Authentication scheme; any non-empty value enables bearer tokens.
    #[serde(default)]
    pub auth_type: String,
    /// Capabilities advertised at registration.
    #[serde(default)]
    pub capabilities: Vec<String>,
    /// Whether AI/ML services are offered to the SMO.
    #[serde(default, rename = "aimlEnabled")]
    pub aiml_enabled: bool,
}

/// A named, typed, located capacity envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcePoolSpec {
    /// Pool name, unique within the O-Cloud.
    pub name: String,
    /// Pool type: `compute`, `network` or `storage`.
    #[serde(rename = "type")]
    pub pool_type: String,
    /// Site or zone.
    #[serde(default)]
    pub location: String,
    /// Declared capacity.
    pub capacity: ResourceCapacity,
    /// Free-form labels.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

/// Capacity per dimension, as quantity strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceCapacity {
    /// CPU, e.g. `"8"` or `"8000m"`.
    pub cpu: String,
    /// Memory, e.g. `"16Gi"`.
    pub memory: String,
    /// Storage, e.g. `"1Ti"`.
    pub storage: String,
    /// Network bandwidth; informational.
    #[serde(default)]
    pub network: String,
}

/// O2 IMS interface settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct O2InterfaceConfig {
    /// Whether the O2 API should be served.
    #[serde(default)]
    pub enabled: bool,
    /// Advertised API version.
    #[serde(default)]
    pub version: String,
    /// Advertised endpoint URLs.
    #[serde(default)]
    pub endpoints: Vec<String>,
    /// Whether O2 requests must carry a bearer token.
    #[serde(default)]
    pub auth_enabled: bool,
}

/// Observed state of an O-Cloud.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OCloudStatus {
    /// Current reconcile phase; absent until the first cycle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<ReconcilePhase>,
    /// Human-readable summary of the last cycle.
    #[serde(default)]
    pub message: String,
    /// Aggregate capacity across the declared pools.
    #[serde(default)]
    pub resource_inventory: ResourceInventory,
    /// SMO connection state.
    #[serde(default, rename = "smoStatus")]
    pub smo_status: String,
    /// O2 interface state.
    #[serde(default, rename = "o2Status")]
    pub o2_status: String,
    /// When the last cycle finished.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reconciled: Option<DateTime<Utc>>,
    /// One condition per type, latest wins.
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl OCloudStatus {
    /// Insert or replace the condition with the same type.
    ///
    /// `last_transition_time` is preserved when neither status nor message
    /// changed, so re-asserting a condition does not churn the status.
    pub fn upsert_condition(&mut self, condition: Condition) {
        match self
            .conditions
            .iter_mut()
            .find(|c| c.condition_type == condition.condition_type)
        {
            Some(existing) => {
                let unchanged = existing.status == condition.status
                    && existing.message == condition.message
                    && existing.reason == condition.reason;
                let since = existing.last_transition_time;
                *existing = condition;
                if unchanged {
                    existing.last_transition_time = since;
                }
            }
            None => self.conditions.push(condition),
        }
    }

    /// Find a condition by type.
    #[must_use]
    pub fn condition(&self, condition_type: &str) -> Option<&Condition> {
        self.conditions
            .iter()
            .find(|c| c.condition_type == condition_type)
    }
}

/// A status condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Condition type; unique within a status.
    #[serde(rename = "type")]
    pub condition_type: String,
    /// `"True"`, `"False"` or `"Unknown"`.
    pub status: String,
    /// When the status or message last changed.
    pub last_transition_time: DateTime<Utc>,
    /// Machine-readable reason.
    #[serde(default)]
    pub reason: String,
    /// Human-readable detail.
    #[serde(default)]
    pub message: String,
}

/// Aggregate capacity across pools.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceInventory {
    /// Total CPU units.
    pub total_cpu: i64,
    /// Unallocated CPU units.
    pub available_cpu: i64,
    /// Total memory in bytes.
    pub total_memory: i64,
    /// Unallocated memory in bytes.
    pub available_memory: i64,
    /// Total storage in bytes.
    pub total_storage: i64,
    /// Unallocated storage in bytes.
    pub available_storage: i64,
    /// Pool count per pool type.
    #[serde(default)]
    pub resource_types: BTreeMap<String, u32>,
}

/// Reconcile phases of an O-Cloud.
///
/// A cycle walks `Initializing` through `Ready`; `Error` can be entered from
/// any step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReconcilePhase {
    /// Cycle started.
    Initializing,
    /// Connecting and registering with the SMO.
    #[serde(rename = "SMOReconciling")]
    SmoReconciling,
    /// Bringing up the O2 API.
    O2Reconciling,
    /// Ensuring pools, namespaces and quotas.
    PoolReconciling,
    /// Refreshing the inventory snapshot.
    InventoryUpdating,
    /// Recording telemetry.
    TelemetryCollecting,
    /// Converged.
    Ready,
    /// A step failed; the cycle will be retried.
    Error,
}

impl ReconcilePhase {
    /// The name used in status and condition types.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initializing => "Initializing",
            Self::SmoReconciling => "SMOReconciling",
            Self::O2Reconciling => "O2Reconciling",
            Self::PoolReconciling => "PoolReconciling",
            Self::InventoryUpdating => "InventoryUpdating",
            Self::TelemetryCollecting => "TelemetryCollecting",
            Self::Ready => "Ready",
            Self::Error => "Error",
        }
    }
}

impl std::fmt::Display for ReconcilePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn condition(kind: &str, message: &str, at: DateTime<Utc>) -> Condition {
        Condition {
            condition_type: kind.to_string(),
            status: "True".to_string(),
            last_transition_time: at,
            reason: String::new(),
            message: message.to_string(),
        }
    }

    #[test]
    fn spec_uses_camel_case_names() {
        let json = r#"{
            "smo": {"enabled": true, "endpoint": "http://smo", "authType": "bearer", "aimlEnabled": true},
            "resourcePools": [{"name": "edge-1", "type": "compute", "location": "site-a",
                               "capacity": {"cpu": "8", "memory": "16Gi", "storage": "1Ti"}}],
            "o2Interface": {"enabled": true, "version": "v1", "authEnabled": false},
            "infrastructureType": "kubernetes",
            "regions": ["eu-west"]
        }"#;

        let spec: OCloudSpec = serde_json::from_str(json).unwrap();
        assert!(spec.smo.enabled);
        assert!(spec.smo.aiml_enabled);
        assert_eq!(spec.smo.auth_type, "bearer");
        assert_eq!(spec.resource_pools[0].pool_type, "compute");
        assert_eq!(spec.resource_pools[0].capacity.memory, "16Gi");
        assert!(spec.o2_interface.enabled);
        assert_eq!(spec.regions, vec!["eu-west"]);
    }

    #[test]
    fn phase_serializes_with_status_names() {
        let status = OCloudStatus {
            phase: Some(ReconcilePhase::SmoReconciling),
            ..Default::default()
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["phase"], "SMOReconciling");
        assert!(json.get("lastReconciled").is_none());
        assert_eq!(json["smoStatus"], "");
    }

    #[test]
    fn upsert_condition_replaces_by_type() {
        let now = Utc::now();
        let mut status = OCloudStatus::default();
        status.upsert_condition(condition("Ready", "ok", now));
        status.upsert_condition(condition("Error", "boom", now));
        status.upsert_condition(condition("Ready", "still ok", now));

        assert_eq!(status.conditions.len(), 2);
        assert_eq!(status.condition("Ready").unwrap().message, "still ok");
    }

    #[test]
    fn upsert_condition_keeps_transition_time_when_unchanged() {
        let first = Utc::now();
        let later = first + Duration::minutes(5);
        let mut status = OCloudStatus::default();

        status.upsert_condition(condition("Ready", "ok", first));
        status.upsert_condition(condition("Ready", "ok", later));
        assert_eq!(status.condition("Ready").unwrap().last_transition_time, first);

        status.upsert_condition(condition("Ready", "changed", later));
        assert_eq!(status.condition("Ready").unwrap().last_transition_time, later);
    }
}
