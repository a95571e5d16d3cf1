//! Core types and utilities for the O-Cloud control plane.
//!
//! This crate provides the foundational types used throughout the workspace:
//!
//! - **Identifiers**: Strongly-typed UUID IDs for allocations, pools, resources,
//!   deployments, alarms, subscriptions and workflow correlation
//! - **Quantities**: Parsing of Kubernetes-style capacity strings (`"4Gi"`, `"500m"`)
//! - **Error types**: Common error definitions shared across crates
//!
//! # Example
//!
//! ```
//! use ocloud_core::{parse_resource_value, AllocationId};
//!
//! let id = AllocationId::generate();
//! assert_eq!(id.to_string().len(), 36);
//!
//! assert_eq!(parse_resource_value("4Gi").unwrap(), 4 * 1024 * 1024 * 1024);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod ids;
pub mod quantity;

pub use error::{CoreError, Result};
pub use ids::{
    AlarmId, AllocationId, CorrelationId, DeploymentId, IdError, ResourceId, ResourcePoolId,
    SubscriptionId,
};
pub use quantity::parse_resource_value;
