//! Kubernetes namespace and quota provisioning for O-Cloud resource pools.
//!
//! This crate provides the [`ClusterProvisioner`] trait and the
//! [`K8sProvisioner`] implementation. For every declared resource pool it:
//!
//! - Creates a namespace `ocloud-{pool}` labelled with the pool's name, type and location
//! - Creates (or patches) a `ResourceQuota` named `{pool}-quota` with the pool's capacity
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Reconciler (pool step)                        │
//! └─────────────────────────────────────────────────────────────────┘
//!                              │ ensure_pool_scope()
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       K8sProvisioner                             │
//! │  ┌─────────────────┐            ┌──────────────────────────┐    │
//! │  │  pool_scope()   │ ─────────► │  Namespace / Quota        │    │
//! │  │  names + limits │            │  builders                 │    │
//! │  └─────────────────┘            └──────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Kubernetes API Server                         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use ocloud_cluster::{ClusterConfig, ClusterProvisioner, K8sProvisioner};
//! use ocloud_store::{ResourceCapacity, ResourcePoolSpec};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provisioner = K8sProvisioner::new(ClusterConfig::default()).await?;
//!
//! let pool = ResourcePoolSpec {
//!     name: "edge-1".to_string(),
//!     pool_type: "compute".to_string(),
//!     location: "site-a".to_string(),
//!     capacity: ResourceCapacity {
//!         cpu: "8".to_string(),
//!         memory: "16Gi".to_string(),
//!         storage: "100Gi".to_string(),
//!         network: String::new(),
//!     },
//!     labels: Default::default(),
//! };
//!
//! let scope = provisioner.ensure_pool_scope(&pool).await?;
//! assert_eq!(scope.namespace, "ocloud-edge-1");
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod k8s;
pub mod quota;
pub mod types;

pub use error::{ClusterError, Result};
pub use k8s::{ClusterProvisioner, K8sProvisioner, NoopProvisioner};
pub use types::{ClusterConfig, PoolScope};

#[cfg(any(test, feature = "test-utils"))]
pub use k8s::mock::MockProvisioner;
