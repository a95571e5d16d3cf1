//! HTTP request handlers.
//!
//! The O2 IMS handlers (`pools`, `resources`, `deployments`, `inventory`,
//! `alarms`, `subscriptions` and the O2 half of `health`) run against
//! [`O2State`](crate::state::O2State). The management handlers (`oclouds`,
//! `telemetry`, `orchestrations`, `agents` and the management half of `health`)
//! run against
//! [`GatewayState`](crate::state::GatewayState).

use std::str::FromStr;

use crate::error::ApiError;

pub mod agents;
pub mod alarms;
pub mod deployments;
pub mod health;
pub mod inventory;
pub mod oclouds;
pub mod orchestrations;
pub mod pools;
pub mod resources;
pub mod subscriptions;
pub mod telemetry;

/// Parse an ID path segment.
fn parse_id<T: FromStr>(raw: &str, kind: &str) -> Result<T, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid {kind} ID: {raw}")))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use axum::http::header::AUTHORIZATION;
    use axum::http::HeaderValue;
    use axum_test::TestServer;
    use ocloud_auth::MockJwtValidator;
    use ocloud_cluster::NoopProvisioner;
    use ocloud_control::{
        ControlConfig, MockO2Interface, NoopSmoClient, O2Interface, ReconcileLoop, Reconciler,
        ResourceManager, TelemetryManager,
    };
    use ocloud_orchestrator::{AgentRegistry, DefaultFallback, Orchestrator, OrchestratorConfig};
    use ocloud_store::{O2InterfaceConfig, ResourceCapacity, ResourcePoolSpec, RocksStore};
    use tempfile::TempDir;
    use tokio_util::sync::CancellationToken;

    use crate::config::GatewayConfig;
    use crate::routes::{create_management_router, create_o2_router};
    use crate::state::{GatewayState, O2State};

    pub struct GatewayFixture {
        pub state: GatewayState<RocksStore>,
        pub o2: Arc<MockO2Interface>,
        _dir: TempDir,
    }

    impl GatewayFixture {
        pub fn server(&self) -> TestServer {
            TestServer::new(create_management_router(self.state.clone())).unwrap()
        }

        /// Reconcile every due O-Cloud once.
        pub async fn reconcile_once(&self) {
            self.state.reconcile.run_once().await.unwrap();
        }
    }

    pub fn gateway() -> GatewayFixture {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(RocksStore::open(dir.path()).unwrap());
        let resources = Arc::new(ResourceManager::default());
        let telemetry = Arc::new(TelemetryManager::default());
        let o2 = Arc::new(MockO2Interface::new());

        let reconciler = Arc::new(Reconciler::new(
            Arc::clone(&store),
            Arc::clone(&resources),
            Arc::clone(&telemetry),
            Arc::new(NoopSmoClient::new()),
            Arc::clone(&o2) as Arc<dyn O2Interface>,
            Arc::new(NoopProvisioner::default()),
            ControlConfig::default(),
        ));
        let orchestrator = Arc::new(Orchestrator::new(
            Arc::new(AgentRegistry::new()),
            Arc::new(DefaultFallback::new(Arc::clone(&resources))),
            OrchestratorConfig::default(),
        ));

        let state = GatewayState::new(
            store,
            Arc::new(ReconcileLoop::new(reconciler)),
            resources,
            telemetry,
            orchestrator,
            CancellationToken::new(),
            GatewayConfig::default(),
        );
        GatewayFixture {
            state,
            o2,
            _dir: dir,
        }
    }

    pub fn o2_state() -> Arc<O2State> {
        Arc::new(O2State::new(
            Arc::new(ResourceManager::default()),
            Arc::new(MockJwtValidator::default()),
        ))
    }

    pub fn o2_server(state: &Arc<O2State>) -> TestServer {
        TestServer::new(create_o2_router(Arc::clone(state), &GatewayConfig::default())).unwrap()
    }

    pub fn enable_auth(state: &O2State) {
        state.set_interface(O2InterfaceConfig {
            enabled: true,
            version: "v1.0".into(),
            endpoints: Vec::new(),
            auth_enabled: true,
        });
    }

    pub fn bearer() -> (axum::http::HeaderName, HeaderValue) {
        (AUTHORIZATION, HeaderValue::from_static("Bearer test-token:smo"))
    }

    pub fn pool_spec(name: &str, pool_type: &str, cpu: &str, memory: &str) -> ResourcePoolSpec {
        ResourcePoolSpec {
            name: name.to_string(),
            pool_type: pool_type.to_string(),
            location: "site-a".to_string(),
            capacity: ResourceCapacity {
                cpu: cpu.to_string(),
                memory: memory.to_string(),
                storage: "100Gi".to_string(),
                network: "10Gbps".to_string(),
            },
            labels: Default::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ocloud_core::ResourceId;

    #[test]
    fn parse_id_rejects_garbage() {
        let id = ResourceId::generate();
        assert_eq!(parse_id::<ResourceId>(&id.to_string(), "resource").unwrap(), id);
        assert!(matches!(
            parse_id::<ResourceId>("not-a-uuid", "resource"),
            Err(ApiError::BadRequest(_))
        ));
    }
}
