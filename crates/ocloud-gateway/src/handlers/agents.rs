//! Sub-agent status endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use ocloud_orchestrator::AgentInfo;
use ocloud_store::Store;

use crate::state::GatewayState;

/// Response for agent list.
#[derive(Debug, Serialize)]
pub struct ListAgentsResponse {
    /// Registered sub-agents with their last status check.
    pub agents: Vec<AgentInfo>,
}

/// `GET /api/v1/agents`
///
/// Checks every registered sub-agent. Phases without an agent run their
/// built-in fallback and do not appear here.
pub async fn list_agents<S>(State(state): State<Arc<GatewayState<S>>>) -> impl IntoResponse
where
    S: Store + 'static,
{
    Json(ListAgentsResponse {
        agents: state.orchestrator.agents().statuses().await,
    })
}

#[cfg(test)]
mod tests {
    use crate::handlers::test_support::gateway;
    use ocloud_orchestrator::{CallLog, RecordingAgent};
    use serde_json::Value;
    use std::sync::Arc;

    #[tokio::test]
    async fn lists_registered_agents_with_health() {
        let fixture = gateway();
        let log = CallLog::default();
        let agents = fixture.state.orchestrator.agents();
        agents.register(
            "security-compliance",
            Arc::new(RecordingAgent::new("security-compliance", log.clone())),
        );
        agents.register(
            "oran-interface",
            Arc::new(RecordingAgent::new("oran-interface", log).unhealthy()),
        );

        let body: Value = fixture.server().get("/api/v1/agents").await.json();
        let listed = body["agents"].as_array().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0]["name"], "oran-interface");
        assert_eq!(listed[0]["healthy"], false);
        assert_eq!(listed[1]["name"], "security-compliance");
        assert_eq!(listed[1]["healthy"], true);
    }
}
