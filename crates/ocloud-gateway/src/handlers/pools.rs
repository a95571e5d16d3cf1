//! O2 resource pool endpoints.
//!
//! Pools are owned by the [`ResourceManager`](ocloud_control::ResourceManager):
//! creating or updating one here ensures it there, so the capacity strings are
//! validated the same way a reconciled O-Cloud's pools are.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use ocloud_control::PoolStatus;
use ocloud_core::ResourcePoolId;
use ocloud_store::{ResourceCapacity, ResourcePoolSpec};

use super::parse_id;
use crate::auth::O2Caller;
use crate::error::ApiError;
use crate::o2_store::PoolRecord;
use crate::state::O2State;

const GIB: i64 = 1024 * 1024 * 1024;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Capacity in O2 units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct O2ResourceCapacity {
    /// CPU units.
    pub compute_units: i64,
    /// Memory in whole GiB.
    #[serde(rename = "memoryGB")]
    pub memory_gb: i64,
    /// Storage in whole GiB.
    #[serde(rename = "storageGB")]
    pub storage_gb: i64,
}

/// A resource pool as reported over O2.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcePoolResponse {
    /// O2 identifier.
    pub id: ResourcePoolId,
    /// Pool name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Pool type.
    #[serde(rename = "type")]
    pub pool_type: String,
    /// Location.
    pub location: String,
    /// Declared capacity.
    pub capacity: O2ResourceCapacity,
    /// Unallocated capacity.
    pub available: O2ResourceCapacity,
    /// Declared network bandwidth.
    pub network: String,
    /// Live allocations.
    pub allocation_count: usize,
    /// Pool status.
    pub status: String,
    /// When the pool was last changed.
    pub last_updated: DateTime<Utc>,
}

impl ResourcePoolResponse {
    fn new(record: PoolRecord, status: PoolStatus) -> Self {
        Self {
            id: record.id,
            name: status.name,
            description: record.description,
            pool_type: status.pool_type,
            location: status.location,
            capacity: O2ResourceCapacity {
                compute_units: status.total_cpu,
                memory_gb: status.total_memory / GIB,
                storage_gb: status.total_storage / GIB,
            },
            available: O2ResourceCapacity {
                compute_units: status.available_cpu,
                memory_gb: status.available_memory / GIB,
                storage_gb: status.available_storage / GIB,
            },
            network: status.network,
            allocation_count: status.allocation_count,
            status: status.status,
            last_updated: status.last_updated,
        }
    }
}

/// Capacity as quantity strings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CapacityBody {
    /// CPU, e.g. `"8"`.
    #[serde(default)]
    pub cpu: String,
    /// Memory, e.g. `"16Gi"`.
    #[serde(default)]
    pub memory: String,
    /// Storage, e.g. `"1Ti"`.
    #[serde(default)]
    pub storage: String,
    /// Network bandwidth, e.g. `"10Gbps"`.
    #[serde(default)]
    pub network: String,
}

/// Request to create or replace a pool.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourcePoolBody {
    /// Pool name; ignored on update.
    #[serde(default)]
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Pool type.
    #[serde(default, rename = "type")]
    pub pool_type: String,
    /// Location.
    #[serde(default)]
    pub location: String,
    /// Declared capacity.
    #[serde(default)]
    pub capacity: CapacityBody,
    /// Labels.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl ResourcePoolBody {
    fn into_spec(self, name: String) -> (ResourcePoolSpec, String) {
        let spec = ResourcePoolSpec {
            name,
            pool_type: self.pool_type,
            location: self.location,
            capacity: ResourceCapacity {
                cpu: self.capacity.cpu,
                memory: self.capacity.memory,
                storage: self.capacity.storage,
                network: self.capacity.network,
            },
            labels: self.labels,
        };
        (spec, self.description)
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// List every managed pool.
///
/// `GET /o2ims/v1/resourcePools`
pub async fn list_pools(
    _caller: O2Caller,
    State(state): State<Arc<O2State>>,
) -> Result<impl IntoResponse, ApiError> {
    let pools: Vec<_> = state
        .resources
        .get_all_pool_status()
        .into_iter()
        .map(|status| ResourcePoolResponse::new(state.records.pool_record(&status.name), status))
        .collect();

    Ok(Json(pools))
}

/// Get one pool.
///
/// `GET /o2ims/v1/resourcePools/:id`
pub async fn get_pool(
    _caller: O2Caller,
    State(state): State<Arc<O2State>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let record = lookup(&state, &id)?;
    let status = state.resources.get_pool_status(&record.name)?;
    Ok(Json(ResourcePoolResponse::new(record, status)))
}

/// Create a pool.
///
/// `POST /o2ims/v1/resourcePools`
pub async fn create_pool(
    caller: O2Caller,
    State(state): State<Arc<O2State>>,
    Json(body): Json<ResourcePoolBody>,
) -> Result<impl IntoResponse, ApiError> {
    if body.name.is_empty() {
        return Err(ApiError::BadRequest("pool name is required".to_string()));
    }
    let name = body.name.clone();
    let (spec, description) = body.into_spec(name);
    state.resources.create_resource_pool(&spec)?;
    let record = state.records.describe_pool(&spec.name, description);
    let status = state.resources.get_pool_status(&spec.name)?;

    info!(
        pool_name = %spec.name,
        pool_id = %record.id,
        caller = %caller.subject(),
        "Resource pool created over O2"
    );
    Ok((StatusCode::CREATED, Json(ResourcePoolResponse::new(record, status))))
}

/// Replace a pool's capacity and description.
///
/// `PUT /o2ims/v1/resourcePools/:id`
pub async fn update_pool(
    _caller: O2Caller,
    State(state): State<Arc<O2State>>,
    Path(id): Path<String>,
    Json(body): Json<ResourcePoolBody>,
) -> Result<impl IntoResponse, ApiError> {
    let record = lookup(&state, &id)?;
    let (spec, description) = body.into_spec(record.name);
    state.resources.ensure_resource_pool(&spec)?;
    let record = state.records.describe_pool(&spec.name, description);
    let status = state.resources.get_pool_status(&spec.name)?;

    Ok(Json(ResourcePoolResponse::new(record, status)))
}

/// Delete a pool. Unknown IDs succeed.
///
/// `DELETE /o2ims/v1/resourcePools/:id`
pub async fn delete_pool(
    _caller: O2Caller,
    State(state): State<Arc<O2State>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: ResourcePoolId = parse_id(&id, "resource pool")?;
    if let Some(record) = state.records.pool(&id) {
        state.resources.remove_resource_pool(&record.name)?;
        state.records.remove_pool(&id);
    }
    Ok(StatusCode::NO_CONTENT)
}

fn lookup(state: &O2State, raw: &str) -> Result<PoolRecord, ApiError> {
    let id: ResourcePoolId = parse_id(raw, "resource pool")?;
    state
        .records
        .pool(&id)
        .ok_or_else(|| ApiError::NotFound(format!("resource pool {id} not found")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{o2_server, o2_state, pool_spec};
    use ocloud_control::ResourceRequest;
    use serde_json::json;

    fn edge_pool_body() -> serde_json::Value {
        json!({
            "name": "edge-1",
            "description": "Edge compute",
            "type": "compute",
            "location": "site-a",
            "capacity": {"cpu": "8", "memory": "16Gi", "storage": "100Gi", "network": "10Gbps"}
        })
    }

    #[tokio::test]
    async fn create_then_get_reports_capacity() {
        let state = o2_state();
        let server = o2_server(&state);

        let response = server
            .post("/o2ims/v1/resourcePools")
            .json(&edge_pool_body())
            .await;
        response.assert_status(StatusCode::CREATED);
        let created: ResourcePoolResponse = response.json();
        assert_eq!(created.capacity.compute_units, 8);
        assert_eq!(created.capacity.memory_gb, 16);
        assert_eq!(created.available.storage_gb, 100);
        assert_eq!(created.description, "Edge compute");

        let fetched: ResourcePoolResponse = server
            .get(&format!("/o2ims/v1/resourcePools/{}", created.id))
            .await
            .json();
        assert_eq!(fetched.name, "edge-1");
    }

    #[tokio::test]
    async fn available_tracks_allocations() {
        let state = o2_state();
        state
            .resources
            .ensure_resource_pool(&pool_spec("edge-1", "compute", "8", "16Gi"))
            .unwrap();
        let request = ResourceRequest::from_quantities("req-1", "edge-1", "4", "8Gi", "").unwrap();
        state.resources.allocate_resources(&request).unwrap();

        let server = o2_server(&state);
        let pools: Vec<ResourcePoolResponse> = server.get("/o2ims/v1/resourcePools").await.json();
        assert_eq!(pools.len(), 1);
        assert_eq!(pools[0].available.compute_units, 4);
        assert_eq!(pools[0].available.memory_gb, 8);
        assert_eq!(pools[0].allocation_count, 1);
    }

    #[tokio::test]
    async fn invalid_capacity_is_bad_request() {
        let server = o2_server(&o2_state());
        let mut body = edge_pool_body();
        body["capacity"]["memory"] = json!("lots");

        server
            .post("/o2ims/v1/resourcePools")
            .json(&body)
            .expect_failure()
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn duplicate_name_conflicts() {
        let server = o2_server(&o2_state());
        let created: ResourcePoolResponse = server
            .post("/o2ims/v1/resourcePools")
            .json(&edge_pool_body())
            .await
            .json();

        let mut second = edge_pool_body();
        second["description"] = json!("Replacement");
        second["capacity"]["cpu"] = json!("2");
        let response = server
            .post("/o2ims/v1/resourcePools")
            .json(&second)
            .expect_failure()
            .await;
        response.assert_status(StatusCode::CONFLICT);
        let body: serde_json::Value = response.json();
        assert_eq!(body["error"]["code"], "conflict");

        let fetched: ResourcePoolResponse = server
            .get(&format!("/o2ims/v1/resourcePools/{}", created.id))
            .await
            .json();
        assert_eq!(fetched.capacity.compute_units, 8);
        assert_eq!(fetched.description, "Edge compute");
    }

    #[tokio::test]
    async fn shrinking_below_allocations_conflicts() {
        let state = o2_state();
        let server = o2_server(&state);
        let created: ResourcePoolResponse = server
            .post("/o2ims/v1/resourcePools")
            .json(&edge_pool_body())
            .await
            .json();
        let request = ResourceRequest::from_quantities("req-1", "edge-1", "6", "1Gi", "").unwrap();
        state.resources.allocate_resources(&request).unwrap();

        let mut body = edge_pool_body();
        body["capacity"]["cpu"] = json!("4");
        server
            .put(&format!("/o2ims/v1/resourcePools/{}", created.id))
            .json(&body)
            .expect_failure()
            .await
            .assert_status(StatusCode::CONFLICT);

        body["capacity"]["cpu"] = json!("12");
        let updated: ResourcePoolResponse = server
            .put(&format!("/o2ims/v1/resourcePools/{}", created.id))
            .json(&body)
            .await
            .json();
        assert_eq!(updated.capacity.compute_units, 12);
        assert_eq!(updated.available.compute_units, 6);
    }

    #[tokio::test]
    async fn delete_is_idempotent_but_refuses_pools_in_use() {
        let state = o2_state();
        let server = o2_server(&state);
        let created: ResourcePoolResponse = server
            .post("/o2ims/v1/resourcePools")
            .json(&edge_pool_body())
            .await
            .json();
        let path = format!("/o2ims/v1/resourcePools/{}", created.id);

        let request = ResourceRequest::from_quantities("req-1", "edge-1", "1", "1Gi", "").unwrap();
        let allocation = state.resources.allocate_resources(&request).unwrap();
        server
            .delete(&path)
            .expect_failure()
            .await
            .assert_status(StatusCode::CONFLICT);

        state.resources.release_resources(&allocation.id).unwrap();
        server.delete(&path).await.assert_status(StatusCode::NO_CONTENT);
        server.delete(&path).await.assert_status(StatusCode::NO_CONTENT);
        server
            .get(&path)
            .expect_failure()
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_id_is_bad_request() {
        let server = o2_server(&o2_state());
        server
            .get("/o2ims/v1/resourcePools/edge-1")
            .expect_failure()
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }
}
