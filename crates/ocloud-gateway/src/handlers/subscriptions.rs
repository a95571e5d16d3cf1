//! O2 event subscription endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use ocloud_core::SubscriptionId;

use super::parse_id;
use crate::auth::O2Caller;
use crate::error::ApiError;
use crate::o2_store::SubscriptionBody;
use crate::state::O2State;

/// `GET /o2ims/v1/subscriptions`
pub async fn list_subscriptions(
    _caller: O2Caller,
    State(state): State<Arc<O2State>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.records.list_subscriptions()))
}

/// `GET /o2ims/v1/subscriptions/:id`
pub async fn get_subscription(
    _caller: O2Caller,
    State(state): State<Arc<O2State>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: SubscriptionId = parse_id(&id, "subscription")?;
    state
        .records
        .get_subscription(&id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("subscription {id} not found")))
}

/// `POST /o2ims/v1/subscriptions`
///
/// The callback must be an `http` or `https` URL.
pub async fn create_subscription(
    caller: O2Caller,
    State(state): State<Arc<O2State>>,
    Json(body): Json<SubscriptionBody>,
) -> Result<impl IntoResponse, ApiError> {
    if !(body.callback.starts_with("http://") || body.callback.starts_with("https://")) {
        return Err(ApiError::BadRequest(format!(
            "callback must be an http(s) URL, got {:?}",
            body.callback
        )));
    }
    let subscription = state.records.create_subscription(body);
    tracing::info!(
        subscription_id = %subscription.id,
        subscription_type = %subscription.subscription_type,
        caller = %caller.subject(),
        "Subscription created"
    );
    Ok((StatusCode::CREATED, Json(subscription)))
}

/// `DELETE /o2ims/v1/subscriptions/:id`
pub async fn delete_subscription(
    _caller: O2Caller,
    State(state): State<Arc<O2State>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: SubscriptionId = parse_id(&id, "subscription")?;
    state.records.delete_subscription(&id);
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{o2_server, o2_state};
    use crate::o2_store::O2Subscription;
    use serde_json::json;

    #[tokio::test]
    async fn subscription_lifecycle() {
        let server = o2_server(&o2_state());
        let response = server
            .post("/o2ims/v1/subscriptions")
            .json(&json!({
                "type": "resource-change",
                "callback": "http://smo.local/notify",
                "filter": {"poolId": "edge-1"}
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let created: O2Subscription = response.json();
        assert!(created.active);
        assert_eq!(created.filter.get("poolId").map(String::as_str), Some("edge-1"));

        let path = format!("/o2ims/v1/subscriptions/{}", created.id);
        let fetched: O2Subscription = server.get(&path).await.json();
        assert_eq!(fetched, created);

        server.delete(&path).await.assert_status(StatusCode::NO_CONTENT);
        let listed: Vec<O2Subscription> = server.get("/o2ims/v1/subscriptions").await.json();
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn callback_must_be_a_url() {
        let server = o2_server(&o2_state());
        server
            .post("/o2ims/v1/subscriptions")
            .json(&json!({"type": "alarm", "callback": "smo"}))
            .expect_failure()
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }
}
