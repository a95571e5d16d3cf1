//! Deployment workflow endpoints.
//!
//! `POST` accepts a RIC deployment intent and starts it in the background; the
//! caller polls `GET /api/v1/orchestrations/:id` with the returned correlation
//! ID to follow the workflow through its phases.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use ocloud_core::CorrelationId;
use ocloud_orchestrator::{DeploymentIntent, WorkflowRecord, WorkflowState};
use ocloud_store::Store;

use super::parse_id;
use crate::error::ApiError;
use crate::state::GatewayState;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Response to an accepted intent.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    /// Correlation ID to poll.
    pub correlation_id: CorrelationId,
    /// Workflow state at acceptance.
    pub status: WorkflowState,
}

/// Response for workflow list.
#[derive(Debug, Serialize)]
pub struct ListWorkflowsResponse {
    /// Known workflows, oldest first.
    pub workflows: Vec<WorkflowRecord>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Start a workflow.
///
/// `POST /api/v1/orchestrations`. Returns 202; the workflow is cancelled if
/// the process shuts down before it finishes.
pub async fn submit<S>(
    State(state): State<Arc<GatewayState<S>>>,
    Json(intent): Json<DeploymentIntent>,
) -> Result<impl IntoResponse, ApiError>
where
    S: Store + 'static,
{
    if intent.kind.is_empty() {
        return Err(ApiError::BadRequest("intent kind is required".to_string()));
    }
    if intent.name().is_empty() {
        return Err(ApiError::BadRequest(
            "intent metadata.name is required".to_string(),
        ));
    }

    let correlation_id = state
        .orchestrator
        .submit(intent, state.shutdown.child_token());

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitResponse {
            correlation_id,
            status: WorkflowState::Running,
        }),
    ))
}

/// Get one workflow.
///
/// `GET /api/v1/orchestrations/:id`
pub async fn get_workflow<S>(
    State(state): State<Arc<GatewayState<S>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    S: Store + 'static,
{
    let id: CorrelationId = parse_id(&id, "correlation")?;
    state
        .orchestrator
        .workflow(&id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("workflow {id} not found")))
}

/// List workflows.
///
/// `GET /api/v1/orchestrations`
pub async fn list_workflows<S>(
    State(state): State<Arc<GatewayState<S>>>,
) -> impl IntoResponse
where
    S: Store + 'static,
{
    Json(ListWorkflowsResponse {
        workflows: state.orchestrator.workflows(),
    })
}
