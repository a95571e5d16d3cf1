//! Types for the cluster crate.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Configuration for pool scope provisioning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Prefix prepended to pool names to form namespace names.
    pub namespace_prefix: String,
    /// Field manager recorded on patched objects.
    pub field_manager: String,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            namespace_prefix: "ocloud-".to_string(),
            field_manager: "ocloud-controller".to_string(),
        }
    }
}

/// The isolated scope provisioned for one resource pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolScope {
    /// Namespace holding the pool's workloads.
    pub namespace: String,
    /// Name of the quota object inside the namespace.
    pub quota_name: String,
    /// Labels applied to the namespace.
    pub labels: BTreeMap<String, String>,
    /// Hard quota limits, keyed by Kubernetes resource name.
    pub hard: BTreeMap<String, String>,
}
