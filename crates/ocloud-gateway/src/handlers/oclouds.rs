//! O-Cloud management endpoints.
//!
//! Writes go to the store and make the O-Cloud due on the reconcile loop's
//! next tick. Status is owned by the reconciler: a `PUT` replaces the spec and
//! keeps whatever status is already stored.

use std::collections::HashSet;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use tracing::{debug, info, warn};

use ocloud_control::ControlError;
use ocloud_store::{OCloud, OCloudSpec, Store};

use crate::error::ApiError;
use crate::state::GatewayState;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Response for O-Cloud list.
#[derive(Debug, Serialize)]
pub struct ListOCloudsResponse {
    /// Every stored O-Cloud, ordered by name.
    pub oclouds: Vec<OCloud>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Create or replace an O-Cloud spec.
///
/// `PUT /api/v1/oclouds/:name`. Returns 201 when the O-Cloud is new.
pub async fn put_ocloud<S>(
    State(state): State<Arc<GatewayState<S>>>,
    Path(name): Path<String>,
    Json(spec): Json<OCloudSpec>,
) -> Result<impl IntoResponse, ApiError>
where
    S: Store + 'static,
{
    if let Some(unnamed) = spec.resource_pools.iter().position(|p| p.name.is_empty()) {
        return Err(ApiError::BadRequest(format!(
            "resource pool at index {unnamed} has no name"
        )));
    }

    let existing = state.store.get_ocloud(&name)?;
    let created = existing.is_none();

    let mut ocloud = OCloud::new(name.clone(), spec);
    if let Some(previous) = existing {
        ocloud.status = previous.status;
    }
    state.store.put_ocloud(&ocloud)?;
    state.reconcile.trigger(&name);

    info!(ocloud = %name, created, "O-Cloud spec stored");
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(ocloud)))
}

/// Get an O-Cloud with its status.
///
/// `GET /api/v1/oclouds/:name`
pub async fn get_ocloud<S>(
    State(state): State<Arc<GatewayState<S>>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    S: Store + 'static,
{
    state
        .store
        .get_ocloud(&name)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("O-Cloud {name} not found")))
}

/// List every O-Cloud.
///
/// `GET /api/v1/oclouds`
pub async fn list_oclouds<S>(
    State(state): State<Arc<GatewayState<S>>>,
) -> Result<impl IntoResponse, ApiError>
where
    S: Store + 'static,
{
    let oclouds = state.store.list_oclouds()?;
    Ok(Json(ListOCloudsResponse { oclouds }))
}

/// Delete an O-Cloud and forget its idle pools.
///
/// `DELETE /api/v1/oclouds/:name`. Pools with outstanding allocations, and pools
/// another stored O-Cloud still declares, stay managed.
pub async fn delete_ocloud<S>(
    State(state): State<Arc<GatewayState<S>>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    S: Store + 'static,
{
    let Some(ocloud) = state.store.get_ocloud(&name)? else {
        return Ok(StatusCode::NO_CONTENT);
    };
    state.store.delete_ocloud(&name)?;

    let still_declared: HashSet<String> = state
        .store
        .list_oclouds()?
        .into_iter()
        .flat_map(|other| other.spec.resource_pools)
        .map(|pool| pool.name)
        .collect();

    for pool in &ocloud.spec.resource_pools {
        if still_declared.contains(&pool.name) {
            debug!(ocloud = %name, pool_name = %pool.name, "Pool declared elsewhere, keeping");
            continue;
        }
        match state.resources.remove_resource_pool(&pool.name) {
            Ok(_) => {}
            Err(e @ ControlError::PoolInUse { .. }) => {
                warn!(ocloud = %name, pool_name = %pool.name, error = %e, "Keeping pool in use");
            }
            Err(e) => return Err(e.into()),
        }
    }

    info!(ocloud = %name, "O-Cloud deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::gateway;
    use ocloud_control::ResourceRequest;
    use ocloud_store::ReconcilePhase;
    use serde_json::{json, Value};

    fn spec() -> Value {
        json!({
            "smo": {"enabled": false},
            "resourcePools": [{
                "name": "edge-1",
                "type": "compute",
                "location": "site-a",
                "capacity": {"cpu": "8", "memory": "16Gi", "storage": "100Gi"}
            }],
            "o2Interface": {"enabled": true, "version": "v1.0"},
            "infrastructureType": "kubernetes",
            "regions": ["eu-west"]
        })
    }

    #[tokio::test]
    async fn put_creates_then_replaces() {
        let fixture = gateway();
        let server = fixture.server();

        server
            .put("/api/v1/oclouds/lab")
            .json(&spec())
            .await
            .assert_status(StatusCode::CREATED);
        server
            .put("/api/v1/oclouds/lab")
            .json(&spec())
            .await
            .assert_status_ok();

        let body: Value = server.get("/api/v1/oclouds/lab").await.json();
        assert_eq!(body["name"], "lab");
        assert_eq!(body["spec"]["resourcePools"][0]["name"], "edge-1");

        let list: Value = server.get("/api/v1/oclouds").await.json();
        assert_eq!(list["oclouds"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn put_keeps_reconciled_status() {
        let fixture = gateway();
        let server = fixture.server();
        server.put("/api/v1/oclouds/lab").json(&spec()).await;

        fixture.reconcile_once().await;
        let before: OCloud = fixture.state.store.get_ocloud("lab").unwrap().unwrap();
        assert_eq!(before.status.phase, Some(ReconcilePhase::Ready));
        assert_eq!(fixture.o2.configs()[0].version, "v1.0");

        server.put("/api/v1/oclouds/lab").json(&spec()).await;
        let after = fixture.state.store.get_ocloud("lab").unwrap().unwrap();
        assert_eq!(after.status, before.status);
    }

    #[tokio::test]
    async fn unknown_ocloud_is_not_found() {
        let fixture = gateway();
        fixture
            .server()
            .get("/api/v1/oclouds/missing")
            .expect_failure()
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unnamed_pool_is_rejected() {
        let fixture = gateway();
        let mut body = spec();
        body["resourcePools"][0]["name"] = json!("");
        fixture
            .server()
            .put("/api/v1/oclouds/lab")
            .json(&body)
            .expect_failure()
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn delete_releases_idle_pools_and_keeps_busy_ones() {
        let fixture = gateway();
        let server = fixture.server();
        server.put("/api/v1/oclouds/lab").json(&spec()).await;
        fixture.reconcile_once().await;
        assert!(fixture.state.resources.get_pool_status("edge-1").is_ok());

        let request = ResourceRequest::from_quantities("req-1", "edge-1", "1", "1Gi", "").unwrap();
        let allocation = fixture.state.resources.allocate_resources(&request).unwrap();

        server
            .delete("/api/v1/oclouds/lab")
            .await
            .assert_status(StatusCode::NO_CONTENT);
        assert!(fixture.state.store.get_ocloud("lab").unwrap().is_none());
        assert!(fixture.state.resources.get_pool_status("edge-1").is_ok());

        fixture.state.resources.release_resources(&allocation.id).unwrap();
        server.put("/api/v1/oclouds/lab").json(&spec()).await;
        server
            .delete("/api/v1/oclouds/lab")
            .await
            .assert_status(StatusCode::NO_CONTENT);
        assert!(fixture.state.resources.get_pool_status("edge-1").is_err());

        server
            .delete("/api/v1/oclouds/lab")
            .await
            .assert_status(StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn delete_keeps_pools_declared_by_other_oclouds() {
        let fixture = gateway();
        let server = fixture.server();
        server.put("/api/v1/oclouds/a").json(&spec()).await;
        server.put("/api/v1/oclouds/b").json(&spec()).await;
        fixture.reconcile_once().await;

        server
            .delete("/api/v1/oclouds/a")
            .await
            .assert_status(StatusCode::NO_CONTENT);

        let pool = fixture.state.resources.get_pool_status("edge-1").unwrap();
        assert_eq!(pool.total_cpu, 8);
        let request = ResourceRequest::from_quantities("req-b", "edge-1", "2", "1Gi", "").unwrap();
        assert!(fixture.state.resources.allocate_resources(&request).is_ok());

        let b: OCloud = fixture.state.store.get_ocloud("b").unwrap().unwrap();
        assert_eq!(b.status.phase, Some(ReconcilePhase::Ready));
    }
}
