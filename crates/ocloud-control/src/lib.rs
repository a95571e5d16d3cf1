//! Control plane for O-Cloud resource orchestration.
//!
//! This crate holds the business logic that keeps declared O-Clouds converged:
//! the capacity-accounted [`ResourceManager`], the [`TelemetryManager`] ring,
//! the SMO and O2 boundaries and the [`Reconciler`] with its run loop.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              ReconcileLoop (tick, requeue schedule)          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │ reconcile(name)
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Reconciler                           │
//! │  SMO ─► O2 ─► Pools ─► Inventory ─► Telemetry ─► Ready       │
//! └─────────────────────────────────────────────────────────────┘
//!        │              │               │                │
//!        ▼              ▼               ▼                ▼
//!  ┌──────────┐  ┌────────────┐  ┌──────────────┐  ┌───────────┐
//!  │SmoClient │  │O2Interface │  │ResourceMgr + │  │  Store    │
//!  │  (HTTP)  │  │ (gateway)  │  │ Provisioner  │  │ (RocksDB) │
//!  └──────────┘  └────────────┘  └──────────────┘  └───────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use ocloud_control::{ResourceManager, ResourceRequest};
//! use ocloud_store::{ResourceCapacity, ResourcePoolSpec};
//!
//! let manager = ResourceManager::default();
//! manager
//!     .ensure_resource_pool(&ResourcePoolSpec {
//!         name: "edge-1".to_string(),
//!         pool_type: "compute".to_string(),
//!         location: "site-a".to_string(),
//!         capacity: ResourceCapacity {
//!             cpu: "8".to_string(),
//!             memory: "16Gi".to_string(),
//!             storage: "100Gi".to_string(),
//!             network: String::new(),
//!         },
//!         labels: Default::default(),
//!     })
//!     .unwrap();
//!
//! let request = ResourceRequest::from_quantities("req-1", "edge-1", "4", "8Gi", "").unwrap();
//! let allocation = manager.allocate_resources(&request).unwrap();
//! assert_eq!(manager.get_pool_utilization("edge-1").unwrap().cpu_utilization, 50.0);
//!
//! manager.release_resources(&allocation.id).unwrap();
//! ```
//!
//! See the [`lifecycle`] module for the reconcile phase state machine.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod lifecycle;
pub mod o2;
pub mod reconciler;
pub mod resources;
pub mod smo_client;
pub mod telemetry;
pub mod types;

pub use error::{ControlError, Dimension, Result};
pub use o2::{NoopO2Interface, O2Interface};
pub use reconciler::{ReconcileLoop, ReconcileOutcome, Reconciler};
pub use resources::ResourceManager;
pub use smo_client::{
    HttpSmoClient, NoopSmoClient, OCloudRegistration, Policy, ResourceUpdate, SmoAlarm, SmoClient,
};
pub use telemetry::TelemetryManager;
pub use types::{
    ControlConfig, PoolStatus, PoolUtilization, ResourceAllocation, ResourceRequest,
    TelemetryMetrics, UtilizationWarning,
};

#[cfg(any(test, feature = "test-utils"))]
pub use o2::mock::MockO2Interface;
#[cfg(any(test, feature = "test-utils"))]
pub use smo_client::mock::MockSmoClient;
