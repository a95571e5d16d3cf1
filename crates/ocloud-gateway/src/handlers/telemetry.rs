//! Telemetry history endpoint.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use ocloud_store::Store;

use crate::state::GatewayState;

const DEFAULT_LIMIT: usize = 100;

/// Query parameters for `GET /api/v1/telemetry`.
#[derive(Debug, Deserialize)]
pub struct TelemetryQuery {
    /// Most recent samples to return; defaults to 100.
    pub limit: Option<usize>,
}

/// Return the most recent telemetry samples, newest last.
pub async fn get_telemetry<S>(
    State(state): State<Arc<GatewayState<S>>>,
    Query(query): Query<TelemetryQuery>,
) -> impl IntoResponse
where
    S: Store + 'static,
{
    Json(state.telemetry.get_metrics(query.limit.unwrap_or(DEFAULT_LIMIT)))
}
