//! O-Cloud Gateway - control plane daemon
//!
//! This is the main entry point for the control plane. It runs the reconcile
//! loop, serves the management API on `LISTEN_ADDR`, and brings up the O2 IMS
//! API on `O2_LISTEN_ADDR` once an O-Cloud asks for it.
//!
//! # Dev Mode
//!
//! Build with `--features dev-mode` to validate O2 bearer tokens with a mock
//! validator instead of the HS256 secret.
//! Use tokens in format: `test-token:<subject>`
//!
//! # Kubernetes
//!
//! Set `KUBERNETES_ENABLED=true` to give every resource pool a namespace and
//! quota in the cluster. Without it pools are only tracked in memory.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(not(feature = "dev-mode"))]
use ocloud_auth::HmacJwtValidator;
#[cfg(feature = "dev-mode")]
use ocloud_auth::MockJwtValidator;
use ocloud_auth::JwtValidator;
use ocloud_cluster::{ClusterConfig, ClusterProvisioner, K8sProvisioner, NoopProvisioner};
use ocloud_control::{
    ControlConfig, HttpSmoClient, ReconcileLoop, Reconciler, ResourceManager, TelemetryManager,
};
use ocloud_gateway::{
    create_management_router, GatewayConfig, GatewayState, O2Server, O2State,
};
use ocloud_orchestrator::{AgentRegistry, DefaultFallback, Orchestrator, OrchestratorConfig};
use ocloud_store::RocksStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,ocloud=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting O-Cloud Gateway");

    let config = GatewayConfig::from_env();
    let mut control_config = ControlConfig::from_env();
    if control_config.smo_auth_token.is_none() {
        control_config.smo_auth_token.clone_from(&config.smo_auth_token);
    }

    tracing::info!(
        listen_addr = %config.listen_addr,
        o2_listen_addr = %config.o2_listen_addr,
        data_dir = %config.data_dir,
        kubernetes_enabled = config.kubernetes_enabled,
        "Gateway configuration loaded"
    );

    let shutdown = CancellationToken::new();

    // Initialize RocksDB store
    tracing::info!(path = %config.data_dir, "Opening RocksDB store");
    let store = Arc::new(RocksStore::open(&config.data_dir)?);

    let resources = Arc::new(ResourceManager::new(
        control_config.utilization_warning_threshold,
    ));
    let telemetry = Arc::new(TelemetryManager::new(control_config.telemetry_capacity));
    let smo = Arc::new(HttpSmoClient::new(
        control_config.smo_timeout(),
        control_config.smo_auth_token.clone(),
    )?);

    let provisioner: Arc<dyn ClusterProvisioner> = if config.kubernetes_enabled {
        tracing::info!("Kubernetes provisioning enabled");
        Arc::new(K8sProvisioner::new(ClusterConfig::default()).await?)
    } else {
        tracing::warn!("KUBERNETES_ENABLED not set - pools are tracked in memory only");
        Arc::new(NoopProvisioner::default())
    };

    // Initialize JWT validator
    #[cfg(feature = "dev-mode")]
    let jwt_validator: Arc<dyn JwtValidator> = {
        tracing::warn!("DEV MODE ENABLED - using mock JWT validator");
        tracing::warn!("Use tokens in format: test-token:<subject>");
        Arc::new(MockJwtValidator::default())
    };

    #[cfg(not(feature = "dev-mode"))]
    let jwt_validator: Arc<dyn JwtValidator> =
        Arc::new(HmacJwtValidator::new(&config.auth_config()));
    tracing::info!("JWT validator initialized");

    let o2_state = Arc::new(O2State::new(resources.clone(), jwt_validator));
    let o2 = Arc::new(O2Server::new(o2_state, config.clone(), shutdown.clone()));

    let reconciler = Arc::new(Reconciler::new(
        store.clone(),
        resources.clone(),
        telemetry.clone(),
        smo,
        o2,
        provisioner,
        control_config,
    ));
    let reconcile = Arc::new(ReconcileLoop::new(reconciler));
    let reconcile_task = tokio::spawn(reconcile.clone().run(shutdown.clone()));
    tracing::info!("Reconcile loop started");

    let orchestrator = Arc::new(Orchestrator::new(
        Arc::new(AgentRegistry::new()),
        Arc::new(DefaultFallback::new(resources.clone())),
        OrchestratorConfig::from_env(),
    ));

    let state = GatewayState::new(
        store,
        reconcile,
        resources,
        telemetry,
        orchestrator,
        shutdown.clone(),
        config.clone(),
    );
    let app = create_management_router(state);

    // Start HTTP server
    tracing::info!(listen_addr = %config.listen_addr, "Starting management API server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutdown signal received");
            signal.cancel();
        })
        .await?;

    shutdown.cancel();
    reconcile_task.await?;
    tracing::info!("Gateway stopped");

    Ok(())
}
