//! Common error types for the O-Cloud control plane.

use thiserror::Error;

/// A result type using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core errors shared across crates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A quantity string was empty.
    #[error("empty resource value")]
    EmptyQuantity,

    /// A quantity string did not contain a valid non-negative integer.
    #[error("invalid resource value {value:?}: {reason}")]
    InvalidQuantity {
        /// The offending input.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// An invalid identifier was provided.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] crate::ids::IdError),
}
