//! Error types for the cluster crate.

use thiserror::Error;

/// Errors that can occur while provisioning pool scopes.
#[derive(Error, Debug)]
pub enum ClusterError {
    /// Kubernetes API error.
    #[error("Kubernetes API error: {0}")]
    KubeApi(#[from] kube::Error),

    /// The pool declaration cannot be turned into cluster objects.
    #[error("Invalid pool declaration: {0}")]
    InvalidPool(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClusterError {
    /// Check if this error is retriable.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::KubeApi(_))
    }

    /// Get the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::InvalidPool(_) | Self::Config(_) => 400,
            Self::KubeApi(_) => 503,
        }
    }
}

/// A specialized Result type for cluster operations.
pub type Result<T> = std::result::Result<T, ClusterError>;
