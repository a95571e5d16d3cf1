//! O2 resource endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use ocloud_core::ResourceId;

use super::parse_id;
use crate::auth::O2Caller;
use crate::error::ApiError;
use crate::o2_store::ResourceBody;
use crate::state::O2State;

/// `GET /o2ims/v1/resources`
pub async fn list_resources(
    _caller: O2Caller,
    State(state): State<Arc<O2State>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.records.list_resources()))
}

/// `GET /o2ims/v1/resources/:id`
pub async fn get_resource(
    _caller: O2Caller,
    State(state): State<Arc<O2State>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: ResourceId = parse_id(&id, "resource")?;
    state
        .records
        .get_resource(&id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("resource {id} not found")))
}

/// `POST /o2ims/v1/resources`
pub async fn create_resource(
    _caller: O2Caller,
    State(state): State<Arc<O2State>>,
    Json(body): Json<ResourceBody>,
) -> Result<impl IntoResponse, ApiError> {
    let resource = state.records.create_resource(body);
    tracing::info!(resource_id = %resource.id, name = %resource.name, "Resource created");
    Ok((StatusCode::CREATED, Json(resource)))
}

/// `PUT /o2ims/v1/resources/:id`
///
/// Stores the body under the path ID, creating the entry if needed.
pub async fn update_resource(
    _caller: O2Caller,
    State(state): State<Arc<O2State>>,
    Path(id): Path<String>,
    Json(body): Json<ResourceBody>,
) -> Result<impl IntoResponse, ApiError> {
    let id: ResourceId = parse_id(&id, "resource")?;
    Ok(Json(state.records.replace_resource(id, body)))
}

/// `DELETE /o2ims/v1/resources/:id`
pub async fn delete_resource(
    _caller: O2Caller,
    State(state): State<Arc<O2State>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: ResourceId = parse_id(&id, "resource")?;
    if state.records.delete_resource(&id) {
        tracing::info!(resource_id = %id, "Resource deleted");
    }
    Ok(StatusCode::NO_CONTENT)
}
