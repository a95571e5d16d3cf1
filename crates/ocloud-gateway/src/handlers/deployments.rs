//! O2 deployment endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use ocloud_core::DeploymentId;

use super::parse_id;
use crate::auth::O2Caller;
use crate::error::ApiError;
use crate::o2_store::DeploymentBody;
use crate::state::O2State;

/// `GET /o2ims/v1/deployments`
pub async fn list_deployments(
    _caller: O2Caller,
    State(state): State<Arc<O2State>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.records.list_deployments()))
}

/// `GET /o2ims/v1/deployments/:id`
pub async fn get_deployment(
    _caller: O2Caller,
    State(state): State<Arc<O2State>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: DeploymentId = parse_id(&id, "deployment")?;
    state
        .records
        .get_deployment(&id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("deployment {id} not found")))
}

/// `POST /o2ims/v1/deployments`
///
/// New deployments start `pending`.
pub async fn create_deployment(
    _caller: O2Caller,
    State(state): State<Arc<O2State>>,
    Json(body): Json<DeploymentBody>,
) -> Result<impl IntoResponse, ApiError> {
    let deployment = state.records.create_deployment(body);
    tracing::info!(
        deployment_id = %deployment.id,
        name = %deployment.name,
        resources = deployment.resources.len(),
        "Deployment created"
    );
    Ok((StatusCode::CREATED, Json(deployment)))
}

/// `PUT /o2ims/v1/deployments/:id`
pub async fn update_deployment(
    _caller: O2Caller,
    State(state): State<Arc<O2State>>,
    Path(id): Path<String>,
    Json(body): Json<DeploymentBody>,
) -> Result<impl IntoResponse, ApiError> {
    let id: DeploymentId = parse_id(&id, "deployment")?;
    Ok(Json(state.records.replace_deployment(id, body)))
}

/// `DELETE /o2ims/v1/deployments/:id`
pub async fn delete_deployment(
    _caller: O2Caller,
    State(state): State<Arc<O2State>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: DeploymentId = parse_id(&id, "deployment")?;
    state.records.delete_deployment(&id);
    Ok(StatusCode::NO_CONTENT)
}
