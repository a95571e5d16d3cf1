//! `RocksDB` storage layer for declared O-Cloud objects.
//!
//! Operators declare O-Clouds through the management API; the reconciler reads
//! them back and writes their observed status. Both sides go through the
//! [`Store`] trait.
//!
//! # Architecture
//!
//! Records live in a single `oclouds` column family as JSON, keyed by the
//! O-Cloud name. Iteration order is therefore name order.
//!
//! # Example
//!
//! ```no_run
//! use ocloud_store::{OCloud, OCloudSpec, RocksStore, Store};
//!
//! let store = RocksStore::open("/tmp/ocloud-db").unwrap();
//! store.put_ocloud(&OCloud::new("edge-cloud", OCloudSpec::default())).unwrap();
//!
//! let names: Vec<_> = store.list_oclouds().unwrap().into_iter().map(|o| o.name).collect();
//! assert_eq!(names, vec!["edge-cloud"]);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod rocks;
pub mod schema;
pub mod types;

pub use error::{Result, StoreError};
pub use rocks::RocksStore;
pub use types::{
    Condition, O2InterfaceConfig, OCloud, OCloudSpec, OCloudStatus, ReconcilePhase,
    ResourceCapacity, ResourceInventory, ResourcePoolSpec, SmoConfig,
};

/// The storage trait for O-Cloud objects.
///
/// Spec writes (`put_ocloud`) and status writes (`update_status`) are separate so
/// the reconciler never overwrites a spec an operator changed mid-cycle.
pub trait Store: Send + Sync {
    /// Insert or replace an O-Cloud record, status included.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_ocloud(&self, ocloud: &OCloud) -> Result<()>;

    /// Get an O-Cloud by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_ocloud(&self, name: &str) -> Result<Option<OCloud>>;

    /// Replace only the status of an existing O-Cloud.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the O-Cloud was deleted.
    fn update_status(&self, name: &str, status: &OCloudStatus) -> Result<()>;

    /// Delete an O-Cloud by name.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the O-Cloud doesn't exist.
    fn delete_ocloud(&self, name: &str) -> Result<()>;

    /// List all O-Clouds, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_oclouds(&self) -> Result<Vec<OCloud>>;
}
