//! Health and discovery endpoints.
//!
//! The management API exposes `/health` (liveness) and `/ready` (the store
//! answers and the process is not shutting down). The O2 API exposes its own
//! `/health` and `/info`. None of these require authentication.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ocloud_store::Store;

use crate::error::ApiError;
use crate::state::{GatewayState, O2State};

/// Capabilities advertised by `/o2ims/v1/info`.
pub const O2_CAPABILITIES: [&str; 5] = [
    "resource-management",
    "deployment-management",
    "inventory-tracking",
    "alarm-management",
    "subscription-management",
];

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: &'static str,
    /// Service version.
    pub version: &'static str,
}

/// Health check handler.
///
/// Returns the current service status. This endpoint is public and
/// does not require authentication.
///
/// # Example
///
/// ```text
/// GET /health
///
/// Response: 200 OK
/// {
///   "status": "healthy",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health() -> impl IntoResponse {
    let response = HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    };

    (StatusCode::OK, Json(response))
}

/// Readiness handler.
///
/// Returns 503 once shutdown has begun or while the store cannot be read.
pub async fn ready<S>(
    State(state): State<Arc<GatewayState<S>>>,
) -> Result<impl IntoResponse, ApiError>
where
    S: Store + 'static,
{
    if state.shutdown.is_cancelled() {
        return Err(ApiError::Unavailable("shutting down".to_string()));
    }
    let oclouds = state.store.list_oclouds().map_err(|e| {
        tracing::warn!(error = %e, "Readiness check could not read the store");
        ApiError::Unavailable("store unavailable".to_string())
    })?;

    Ok(Json(serde_json::json!({
        "status": "ready",
        "oclouds": oclouds.len(),
    })))
}

/// O2 health response.
#[derive(Debug, Serialize, Deserialize)]
pub struct O2HealthResponse {
    /// Always `"healthy"`.
    pub status: String,
    /// Current time.
    pub timestamp: DateTime<Utc>,
    /// Active interface version.
    pub version: String,
    /// Seconds since the O2 state was created.
    pub uptime: u64,
}

/// `GET /o2ims/v1/health`
pub async fn o2_health(State(state): State<Arc<O2State>>) -> impl IntoResponse {
    Json(O2HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        version: state.interface().version,
        uptime: state.uptime_seconds(),
    })
}

/// O2 capability discovery response.
#[derive(Debug, Serialize, Deserialize)]
pub struct O2InfoResponse {
    /// Interface name.
    pub name: String,
    /// Active interface version.
    pub version: String,
    /// Human-readable description.
    pub description: String,
    /// Advertised endpoint URLs.
    pub endpoints: Vec<String>,
    /// Supported capability names.
    pub capabilities: Vec<String>,
    /// When the interface came up.
    pub started_at: DateTime<Utc>,
}

/// `GET /o2ims/v1/info`
pub async fn o2_info(State(state): State<Arc<O2State>>) -> impl IntoResponse {
    let interface = state.interface();
    Json(O2InfoResponse {
        name: "O-Cloud O2 Interface".to_string(),
        version: interface.version,
        description: "O-RAN O2 Interface for cloud infrastructure management".to_string(),
        endpoints: interface.endpoints,
        capabilities: O2_CAPABILITIES.iter().map(ToString::to_string).collect(),
        started_at: state.started_at(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{enable_auth, gateway, o2_server, o2_state};

    #[tokio::test]
    async fn health_returns_ok() {
        let response = health().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn ready_until_shutdown() {
        let fixture = gateway();
        let server = fixture.server();

        let body: serde_json::Value = server.get("/ready").await.json();
        assert_eq!(body["status"], "ready");

        fixture.state.shutdown.cancel();
        server
            .get("/ready")
            .expect_failure()
            .await
            .assert_status(StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn o2_health_and_info_skip_auth() {
        let state = o2_state();
        enable_auth(&state);
        let server = o2_server(&state);

        let health: O2HealthResponse = server.get("/o2ims/v1/health").await.json();
        assert_eq!(health.status, "healthy");
        assert_eq!(health.version, "v1.0");

        let info: O2InfoResponse = server.get("/o2ims/v1/info").await.json();
        assert_eq!(info.name, "O-Cloud O2 Interface");
        assert_eq!(info.capabilities.len(), 5);
        assert!(info.capabilities.contains(&"alarm-management".to_string()));
    }
}
