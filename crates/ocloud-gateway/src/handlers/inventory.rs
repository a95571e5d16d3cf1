//! O2 aggregate inventory endpoints.
//!
//! Figures are computed on each request from the resource manager's pool
//! snapshots, grouped by pool type (`compute`, `network`, `storage`).

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ocloud_control::PoolStatus;

use crate::auth::O2Caller;
use crate::error::ApiError;
use crate::state::O2State;

const GIB: i64 = 1024 * 1024 * 1024;

/// Compute capacity across `compute` pools.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeInventory {
    /// Number of compute pools.
    pub total_pools: usize,
    /// Declared CPU units.
    pub total_cores: i64,
    /// Unallocated CPU units.
    pub available_cores: i64,
    /// Declared memory in GiB.
    #[serde(rename = "totalMemoryGB")]
    pub total_memory_gb: i64,
    /// Unallocated memory in GiB.
    #[serde(rename = "availableMemoryGB")]
    pub available_memory_gb: i64,
}

/// Bandwidth across `network` pools.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInventory {
    /// Number of network pools.
    pub total_pools: usize,
    /// Sum of the declared bandwidths that parse.
    pub total_bandwidth_gbps: f64,
}

/// Storage capacity across `storage` pools.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageInventory {
    /// Number of storage pools.
    pub total_pools: usize,
    /// Declared storage in GiB.
    #[serde(rename = "totalCapacityGB")]
    pub total_capacity_gb: i64,
    /// Unallocated storage in GiB.
    #[serde(rename = "availableCapacityGB")]
    pub available_capacity_gb: i64,
}

/// The whole inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct O2Inventory {
    /// When the figures were computed.
    pub timestamp: DateTime<Utc>,
    /// Compute section.
    pub compute: ComputeInventory,
    /// Network section.
    pub network: NetworkInventory,
    /// Storage section.
    pub storage: StorageInventory,
}

impl O2Inventory {
    /// Aggregate pool snapshots.
    #[must_use]
    pub fn from_pools(pools: &[PoolStatus]) -> Self {
        let mut inventory = Self {
            timestamp: Utc::now(),
            compute: ComputeInventory::default(),
            network: NetworkInventory::default(),
            storage: StorageInventory::default(),
        };

        for pool in pools {
            match pool.pool_type.as_str() {
                "compute" => {
                    let compute = &mut inventory.compute;
                    compute.total_pools += 1;
                    compute.total_cores += pool.total_cpu;
                    compute.available_cores += pool.available_cpu;
                    compute.total_memory_gb += pool.total_memory / GIB;
                    compute.available_memory_gb += pool.available_memory / GIB;
                }
                "network" => {
                    inventory.network.total_pools += 1;
                    if let Some(gbps) = parse_bandwidth_gbps(&pool.network) {
                        inventory.network.total_bandwidth_gbps += gbps;
                    }
                }
                "storage" => {
                    let storage = &mut inventory.storage;
                    storage.total_pools += 1;
                    storage.total_capacity_gb += pool.total_storage / GIB;
                    storage.available_capacity_gb += pool.available_storage / GIB;
                }
                _ => {}
            }
        }
        inventory
    }
}

/// Parse a bandwidth string such as `"10Gbps"`, `"500Mbps"` or `"1Tbps"` into Gbps.
///
/// A bare number is taken as Gbps.
fn parse_bandwidth_gbps(raw: &str) -> Option<f64> {
    let lower = raw.trim().to_ascii_lowercase();
    // Scale factors are to Mbps.
    let (number, mbps) = [("tbps", 1_000_000.0), ("gbps", 1000.0), ("mbps", 1.0), ("kbps", 0.001)]
        .into_iter()
        .find_map(|(suffix, mbps)| lower.strip_suffix(suffix).map(|n| (n.to_string(), mbps)))
        .unwrap_or_else(|| (lower.clone(), 1000.0));

    let value: f64 = number.trim().parse().ok()?;
    (value.is_finite() && value >= 0.0).then_some(value * mbps / 1000.0)
}

fn snapshot(state: &O2State) -> O2Inventory {
    O2Inventory::from_pools(&state.resources.get_all_pool_status())
}

/// `GET /o2ims/v1/inventory`
pub async fn get_inventory(
    _caller: O2Caller,
    State(state): State<Arc<O2State>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(snapshot(&state)))
}

/// `GET /o2ims/v1/inventory/compute`
pub async fn get_compute_inventory(
    _caller: O2Caller,
    State(state): State<Arc<O2State>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(snapshot(&state).compute))
}

/// `GET /o2ims/v1/inventory/network`
pub async fn get_network_inventory(
    _caller: O2Caller,
    State(state): State<Arc<O2State>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(snapshot(&state).network))
}

/// `GET /o2ims/v1/inventory/storage`
pub async fn get_storage_inventory(
    _caller: O2Caller,
    State(state): State<Arc<O2State>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(snapshot(&state).storage))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{o2_server, o2_state, pool_spec};
    use ocloud_control::ResourceRequest;

    #[test]
    fn bandwidth_units() {
        assert_eq!(parse_bandwidth_gbps("10Gbps"), Some(10.0));
        assert_eq!(parse_bandwidth_gbps("500Mbps"), Some(0.5));
        assert_eq!(parse_bandwidth_gbps("1Tbps"), Some(1000.0));
        assert_eq!(parse_bandwidth_gbps("25"), Some(25.0));
        assert_eq!(parse_bandwidth_gbps(""), None);
        assert_eq!(parse_bandwidth_gbps("fast"), None);
    }

    #[tokio::test]
    async fn inventory_groups_by_pool_type() {
        let state = o2_state();
        let resources = &state.resources;
        resources
            .ensure_resource_pool(&pool_spec("edge-1", "compute", "8", "16Gi"))
            .unwrap();
        resources
            .ensure_resource_pool(&pool_spec("edge-2", "compute", "16", "32Gi"))
            .unwrap();
        resources
            .ensure_resource_pool(&pool_spec("fabric", "network", "0", "0"))
            .unwrap();
        resources
            .ensure_resource_pool(&pool_spec("san", "storage", "0", "0"))
            .unwrap();
        let request = ResourceRequest::from_quantities("req-1", "edge-1", "4", "8Gi", "").unwrap();
        resources.allocate_resources(&request).unwrap();

        let server = o2_server(&state);
        let inventory: O2Inventory = server.get("/o2ims/v1/inventory").await.json();

        assert_eq!(inventory.compute.total_pools, 2);
        assert_eq!(inventory.compute.total_cores, 24);
        assert_eq!(inventory.compute.available_cores, 20);
        assert_eq!(inventory.compute.total_memory_gb, 48);
        assert_eq!(inventory.compute.available_memory_gb, 40);
        assert_eq!(inventory.network.total_pools, 1);
        assert!((inventory.network.total_bandwidth_gbps - 10.0).abs() < f64::EPSILON);
        assert_eq!(inventory.storage.total_pools, 1);
        assert_eq!(inventory.storage.total_capacity_gb, 100);

        let compute: ComputeInventory = server.get("/o2ims/v1/inventory/compute").await.json();
        assert_eq!(compute, inventory.compute);
        let storage: StorageInventory = server.get("/o2ims/v1/inventory/storage").await.json();
        assert_eq!(storage, inventory.storage);
    }

    #[tokio::test]
    async fn empty_inventory() {
        let server = o2_server(&o2_state());
        let network: NetworkInventory = server.get("/o2ims/v1/inventory/network").await.json();
        assert_eq!(network, NetworkInventory::default());
    }
}
