//! Gateway application state.
//!
//! Two states exist because the gateway serves two routers: [`O2State`] backs
//! the O2 IMS API and [`GatewayState`] backs the management API.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use ocloud_auth::JwtValidator;
use ocloud_control::{ReconcileLoop, ResourceManager, TelemetryManager};
use ocloud_orchestrator::Orchestrator;
use ocloud_store::{O2InterfaceConfig, Store};
use tokio_util::sync::CancellationToken;

use crate::config::GatewayConfig;
use crate::o2_store::O2Store;

/// Shared state for the O2 IMS handlers.
pub struct O2State {
    /// Pool capacity and allocations.
    pub resources: Arc<ResourceManager>,
    /// Resources, deployments, alarms and subscriptions.
    pub records: O2Store,
    /// Validator for bearer tokens when auth is enabled.
    pub jwt_validator: Arc<dyn JwtValidator>,
    interface: RwLock<O2InterfaceConfig>,
    started_at: DateTime<Utc>,
    started: Instant,
}

impl O2State {
    /// Create the O2 state. Auth stays off until a config enables it.
    #[must_use]
    pub fn new(resources: Arc<ResourceManager>, jwt_validator: Arc<dyn JwtValidator>) -> Self {
        Self {
            resources,
            records: O2Store::new(),
            jwt_validator,
            interface: RwLock::new(O2InterfaceConfig::default()),
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    /// The active interface configuration.
    #[must_use]
    pub fn interface(&self) -> O2InterfaceConfig {
        self.interface.read().clone()
    }

    /// Replace the active interface configuration.
    pub fn set_interface(&self, config: O2InterfaceConfig) {
        *self.interface.write() = config;
    }

    /// Whether requests must carry a bearer token.
    #[must_use]
    pub fn auth_enabled(&self) -> bool {
        self.interface.read().auth_enabled
    }

    /// When the state was created.
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Whole seconds since the state was created.
    #[must_use]
    pub fn uptime_seconds(&self) -> u64 {
        self.started.elapsed().as_secs()
    }
}

/// Shared application state for the management API.
pub struct GatewayState<S>
where
    S: Store,
{
    /// O-Cloud persistence.
    pub store: Arc<S>,
    /// The reconcile loop, used to trigger a pass after a write.
    pub reconcile: Arc<ReconcileLoop<S>>,
    /// Pool capacity and allocations.
    pub resources: Arc<ResourceManager>,
    /// Telemetry history.
    pub telemetry: Arc<TelemetryManager>,
    /// The deployment workflow engine.
    pub orchestrator: Arc<Orchestrator>,
    /// Cancelled when the process is shutting down.
    pub shutdown: CancellationToken,
    /// Gateway configuration.
    pub config: GatewayConfig,
}

impl<S> GatewayState<S>
where
    S: Store,
{
    /// Create a new gateway state.
    #[must_use]
    pub fn new(
        store: Arc<S>,
        reconcile: Arc<ReconcileLoop<S>>,
        resources: Arc<ResourceManager>,
        telemetry: Arc<TelemetryManager>,
        orchestrator: Arc<Orchestrator>,
        shutdown: CancellationToken,
        config: GatewayConfig,
    ) -> Self {
        Self {
            store,
            reconcile,
            resources,
            telemetry,
            orchestrator,
            shutdown,
            config,
        }
    }
}

impl<S> Clone for GatewayState<S>
where
    S: Store,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            reconcile: Arc::clone(&self.reconcile),
            resources: Arc::clone(&self.resources),
            telemetry: Arc::clone(&self.telemetry),
            orchestrator: Arc::clone(&self.orchestrator),
            shutdown: self.shutdown.clone(),
            config: self.config.clone(),
        }
    }
}
