//! O2 alarm endpoints.
//!
//! Alarms are raised with `POST /alarms` and cleared from operator attention by
//! acknowledging them. Acknowledged alarms stay listed.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use ocloud_core::AlarmId;

use super::parse_id;
use crate::auth::O2Caller;
use crate::error::ApiError;
use crate::o2_store::{AlarmBody, O2Alarm};
use crate::state::O2State;

/// Response to an acknowledgement.
#[derive(Debug, Serialize, Deserialize)]
pub struct AcknowledgeResponse {
    /// Always `"acknowledged"`.
    pub status: String,
    /// The alarm after acknowledgement.
    pub alarm: O2Alarm,
}

/// `GET /o2ims/v1/alarms`
pub async fn list_alarms(
    _caller: O2Caller,
    State(state): State<Arc<O2State>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.records.list_alarms()))
}

/// `GET /o2ims/v1/alarms/:id`
pub async fn get_alarm(
    _caller: O2Caller,
    State(state): State<Arc<O2State>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: AlarmId = parse_id(&id, "alarm")?;
    state
        .records
        .get_alarm(&id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("alarm {id} not found")))
}

/// `POST /o2ims/v1/alarms`
pub async fn raise_alarm(
    _caller: O2Caller,
    State(state): State<Arc<O2State>>,
    Json(body): Json<AlarmBody>,
) -> Result<impl IntoResponse, ApiError> {
    if body.severity.is_empty() {
        return Err(ApiError::BadRequest("alarm severity is required".to_string()));
    }
    let alarm = state.records.raise_alarm(body);
    warn!(
        alarm_id = %alarm.id,
        severity = %alarm.severity,
        source = %alarm.source,
        "Alarm raised: {}",
        alarm.description
    );
    Ok((StatusCode::CREATED, Json(alarm)))
}

/// `POST /o2ims/v1/alarms/:id/acknowledge`
pub async fn acknowledge_alarm(
    caller: O2Caller,
    State(state): State<Arc<O2State>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: AlarmId = parse_id(&id, "alarm")?;
    let alarm = state
        .records
        .acknowledge_alarm(&id)
        .ok_or_else(|| ApiError::NotFound(format!("alarm {id} not found")))?;

    info!(alarm_id = %id, caller = %caller.subject(), "Alarm acknowledged");
    Ok(Json(AcknowledgeResponse {
        status: "acknowledged".to_string(),
        alarm,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{o2_server, o2_state};
    use serde_json::json;

    #[tokio::test]
    async fn raise_get_and_acknowledge() {
        let server = o2_server(&o2_state());
        let response = server
            .post("/o2ims/v1/alarms")
            .json(&json!({
                "type": "resource",
                "severity": "warning",
                "source": "edge-1",
                "description": "CPU utilization above 80%"
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let alarm: O2Alarm = response.json();
        assert!(!alarm.acknowledged);

        let acked: AcknowledgeResponse = server
            .post(&format!("/o2ims/v1/alarms/{}/acknowledge", alarm.id))
            .await
            .json();
        assert_eq!(acked.status, "acknowledged");
        assert!(acked.alarm.acknowledged);
        assert!(acked.alarm.acknowledged_at.is_some());

        let fetched: O2Alarm = server
            .get(&format!("/o2ims/v1/alarms/{}", alarm.id))
            .await
            .json();
        assert!(fetched.acknowledged);

        let listed: Vec<O2Alarm> = server.get("/o2ims/v1/alarms").await.json();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn acknowledging_unknown_alarm_is_not_found() {
        let server = o2_server(&o2_state());
        server
            .post(&format!("/o2ims/v1/alarms/{}/acknowledge", AlarmId::generate()))
            .expect_failure()
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn severity_is_required() {
        let server = o2_server(&o2_state());
        server
            .post("/o2ims/v1/alarms")
            .json(&json!({"type": "resource"}))
            .expect_failure()
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }
}
