//! The O2 IMS API server.
//!
//! [`O2Server`] is what the reconciler talks to through the control crate's
//! [`O2Interface`] trait. `initialize` swaps in the O-Cloud's interface config;
//! `start_api_server` binds the O2 listener on first call and serves the O2
//! router until the shutdown token fires.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use ocloud_control::{ControlError, O2Interface};
use ocloud_store::O2InterfaceConfig;

use crate::config::GatewayConfig;
use crate::routes::create_o2_router;
use crate::state::O2State;

/// Serves the O2 IMS API on `O2_LISTEN_ADDR`.
pub struct O2Server {
    state: Arc<O2State>,
    config: GatewayConfig,
    shutdown: CancellationToken,
    bound: Mutex<Option<SocketAddr>>,
}

impl O2Server {
    /// Create a server over `state`. Nothing is bound until `start_api_server`.
    #[must_use]
    pub fn new(state: Arc<O2State>, config: GatewayConfig, shutdown: CancellationToken) -> Self {
        Self {
            state,
            config,
            shutdown,
            bound: Mutex::new(None),
        }
    }

    /// The state the O2 handlers run against.
    #[must_use]
    pub fn state(&self) -> &Arc<O2State> {
        &self.state
    }

    /// The bound address, once serving.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        *self.bound.lock().await
    }
}

#[async_trait]
impl O2Interface for O2Server {
    async fn initialize(&self, config: &O2InterfaceConfig) -> ocloud_control::Result<()> {
        info!(
            version = %config.version,
            auth_enabled = config.auth_enabled,
            "Initializing O2 interface"
        );
        if config.auth_enabled && !self.config.auth_config().is_configured() {
            warn!("O2 auth enabled without O2_JWT_SECRET, tokens will be rejected");
        }
        self.state.set_interface(config.clone());
        Ok(())
    }

    async fn start_api_server(&self) -> ocloud_control::Result<()> {
        let mut bound = self.bound.lock().await;
        if bound.is_some() {
            return Ok(());
        }

        let addr = &self.config.o2_listen_addr;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ControlError::O2(format!("failed to bind {addr}: {e}")))?;
        let local = listener
            .local_addr()
            .map_err(|e| ControlError::O2(format!("failed to read bound address: {e}")))?;

        let router = create_o2_router(Arc::clone(&self.state), &self.config);
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await;
            if let Err(e) = result {
                error!(error = %e, "O2 API server error");
            }
            info!("O2 API server stopped");
        });

        info!(addr = %local, "O2 API server started");
        *bound = Some(local);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ocloud_auth::MockJwtValidator;
    use ocloud_control::ResourceManager;

    fn server() -> O2Server {
        let state = Arc::new(O2State::new(
            Arc::new(ResourceManager::default()),
            Arc::new(MockJwtValidator::default()),
        ));
        let config = GatewayConfig {
            o2_listen_addr: "127.0.0.1:0".to_string(),
            ..GatewayConfig::default()
        };
        O2Server::new(state, config, CancellationToken::new())
    }

    #[tokio::test]
    async fn initialize_replaces_interface_config() {
        let server = server();
        server
            .initialize(&O2InterfaceConfig {
                enabled: true,
                version: "v1.0".into(),
                endpoints: vec!["http://o2.local".into()],
                auth_enabled: true,
            })
            .await
            .unwrap();

        assert!(server.state().auth_enabled());
        assert_eq!(server.state().interface().version, "v1.0");
    }

    #[tokio::test]
    async fn start_binds_once_and_serves() {
        let server = server();
        server
            .initialize(&O2InterfaceConfig {
                enabled: true,
                version: "v1.0".into(),
                ..O2InterfaceConfig::default()
            })
            .await
            .unwrap();

        server.start_api_server().await.unwrap();
        let addr = server.local_addr().await.unwrap();
        server.start_api_server().await.unwrap();
        assert_eq!(server.local_addr().await, Some(addr));

        let body: serde_json::Value = reqwest::get(format!("http://{addr}/o2ims/v1/health"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["version"], "v1.0");

        server.shutdown.cancel();
    }

    #[tokio::test]
    async fn bind_failure_is_reported() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let state = Arc::new(O2State::new(
            Arc::new(ResourceManager::default()),
            Arc::new(MockJwtValidator::default()),
        ));
        let config = GatewayConfig {
            o2_listen_addr: taken.local_addr().unwrap().to_string(),
            ..GatewayConfig::default()
        };
        let server = O2Server::new(state, config, CancellationToken::new());

        let err = server.start_api_server().await.unwrap_err();
        assert!(matches!(err, ControlError::O2(_)));
        assert!(server.local_addr().await.is_none());
    }
}
