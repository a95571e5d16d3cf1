//! Error types for the control plane.
//!
//! This module defines the errors raised by resource accounting, the SMO
//! boundary, the O2 boundary and the reconciler.

use std::fmt;

use ocloud_core::{AllocationId, CoreError};
use ocloud_store::ReconcilePhase;
use thiserror::Error;

/// A result type using `ControlError`.
pub type Result<T> = std::result::Result<T, ControlError>;

/// A capacity dimension tracked by the resource manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    /// CPU units.
    Cpu,
    /// Memory bytes.
    Memory,
    /// Storage bytes.
    Storage,
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cpu => "CPU",
            Self::Memory => "memory",
            Self::Storage => "storage",
        })
    }
}

/// Errors that can occur in control plane operations.
#[derive(Debug, Error)]
pub enum ControlError {
    /// The requested resource pool was not found.
    #[error("resource pool {0} not found")]
    PoolNotFound(String),

    /// A pool with this name is already managed.
    #[error("resource pool {0} already exists")]
    PoolAlreadyExists(String),

    /// The requested allocation was not found.
    #[error("allocation {0} not found")]
    AllocationNotFound(AllocationId),

    /// A request asked for more than the pool has left.
    #[error("insufficient {dimension}: requested {requested}, available {available}")]
    InsufficientCapacity {
        /// The over-subscribed dimension.
        dimension: Dimension,
        /// Amount requested.
        requested: i64,
        /// Amount still unallocated.
        available: i64,
    },

    /// A pool update would leave less capacity than is already allocated.
    #[error(
        "cannot shrink {dimension} of pool {pool} to {total}: {allocated} is allocated"
    )]
    CapacityShrink {
        /// The pool being updated.
        pool: String,
        /// The dimension that would go negative.
        dimension: Dimension,
        /// The new declared total.
        total: i64,
        /// What is currently allocated.
        allocated: i64,
    },

    /// A pool cannot be removed while allocations reference it.
    #[error("resource pool {pool} has {allocations} outstanding allocations")]
    PoolInUse {
        /// The pool being removed.
        pool: String,
        /// Number of live allocations.
        allocations: usize,
    },

    /// A capacity string could not be parsed.
    #[error("failed to parse {dimension} capacity: {source}")]
    InvalidQuantity {
        /// The dimension whose value was malformed.
        dimension: Dimension,
        /// The parse failure.
        #[source]
        source: CoreError,
    },

    /// A request was malformed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The SMO rejected a call or could not be reached.
    #[error("{message}")]
    Smo {
        /// HTTP status, when the SMO answered.
        status: Option<u16>,
        /// What went wrong.
        message: String,
    },

    /// The O2 interface could not be brought up.
    #[error("O2 interface error: {0}")]
    O2(String),

    /// The O-Cloud is not declared.
    #[error("O-Cloud {0} not found")]
    OCloudNotFound(String),

    /// A reconcile phase transition that the state machine forbids.
    #[error("invalid phase transition: cannot move from {from:?} to {to}")]
    InvalidTransition {
        /// The current phase.
        from: Option<ReconcilePhase>,
        /// The requested phase.
        to: ReconcilePhase,
    },

    /// A reconcile step failed; `context` says which object it was working on.
    #[error("{context}: {source}")]
    Step {
        /// What was being attempted.
        context: String,
        /// The underlying failure.
        #[source]
        source: Box<ControlError>,
    },

    /// Cluster provisioning error.
    #[error("cluster error: {0}")]
    Cluster(#[from] ocloud_cluster::ClusterError),

    /// Storage layer error.
    #[error("storage error: {0}")]
    Store(#[from] ocloud_store::StoreError),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ControlError {
    /// Wrap this error with what the caller was doing.
    #[must_use]
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Step {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Returns the appropriate HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::PoolNotFound(_) | Self::AllocationNotFound(_) | Self::OCloudNotFound(_) => 404,
            Self::PoolAlreadyExists(_)
            | Self::InsufficientCapacity { .. }
            | Self::CapacityShrink { .. }
            | Self::PoolInUse { .. }
            | Self::InvalidTransition { .. } => 409,
            Self::InvalidQuantity { .. } | Self::InvalidRequest(_) => 400,
            Self::Smo { .. } | Self::O2(_) => 502,
            Self::Cluster(e) => e.http_status_code(),
            Self::Step { source, .. } => source.http_status_code(),
            Self::Store(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns true if this error might be resolved by retrying.
    ///
    /// Capacity errors are not retriable here: the caller has to release
    /// something first.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Smo { status, .. } => status.map_or(true, |s| s >= 500 || s == 429),
            Self::Cluster(e) => e.is_retriable(),
            Self::Step { source, .. } => source.is_retriable(),
            Self::O2(_) | Self::Store(_) | Self::Internal(_) => true,
            _ => false,
        }
    }
}
