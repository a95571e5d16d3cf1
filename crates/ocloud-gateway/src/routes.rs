//! Router configuration.
//!
//! This module sets up the two Axum routers (O2 IMS and management) with their
//! routes and the shared middleware stack.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use ocloud_store::Store;

use crate::config::GatewayConfig;
use crate::handlers::{
    agents, alarms, deployments, health, inventory, oclouds, orchestrations, pools, resources,
    subscriptions, telemetry,
};
use crate::state::{GatewayState, O2State};

/// Base path of the O2 IMS API.
pub const O2_BASE_PATH: &str = "/o2ims/v1";

/// Create the O2 IMS router.
///
/// # Routes (under `/o2ims/v1`)
///
/// ## Public
/// - `GET /health` - Liveness with uptime
/// - `GET /info` - Capability discovery
///
/// ## Bearer token when `authEnabled`
/// - `GET|POST /resourcePools`, `GET|PUT|DELETE /resourcePools/:id`
/// - `GET|POST /resources`, `GET|PUT|DELETE /resources/:id`
/// - `GET|POST /deployments`, `GET|PUT|DELETE /deployments/:id`
/// - `GET /inventory`, `GET /inventory/compute|network|storage`
/// - `GET|POST /alarms`, `GET /alarms/:id`, `POST /alarms/:id/acknowledge`
/// - `GET|POST /subscriptions`, `GET|DELETE /subscriptions/:id`
pub fn create_o2_router(state: Arc<O2State>, config: &GatewayConfig) -> Router {
    let api = Router::new()
        // Health (public)
        .route("/health", get(health::o2_health))
        .route("/info", get(health::o2_info))
        // Resource pools
        .route(
            "/resourcePools",
            get(pools::list_pools).post(pools::create_pool),
        )
        .route(
            "/resourcePools/:id",
            get(pools::get_pool)
                .put(pools::update_pool)
                .delete(pools::delete_pool),
        )
        // Resources
        .route(
            "/resources",
            get(resources::list_resources).post(resources::create_resource),
        )
        .route(
            "/resources/:id",
            get(resources::get_resource)
                .put(resources::update_resource)
                .delete(resources::delete_resource),
        )
        // Deployments
        .route(
            "/deployments",
            get(deployments::list_deployments).post(deployments::create_deployment),
        )
        .route(
            "/deployments/:id",
            get(deployments::get_deployment)
                .put(deployments::update_deployment)
                .delete(deployments::delete_deployment),
        )
        // Inventory
        .route("/inventory", get(inventory::get_inventory))
        .route("/inventory/compute", get(inventory::get_compute_inventory))
        .route("/inventory/network", get(inventory::get_network_inventory))
        .route("/inventory/storage", get(inventory::get_storage_inventory))
        // Alarms
        .route("/alarms", get(alarms::list_alarms).post(alarms::raise_alarm))
        .route("/alarms/:id", get(alarms::get_alarm))
        .route("/alarms/:id/acknowledge", post(alarms::acknowledge_alarm))
        // Subscriptions
        .route(
            "/subscriptions",
            get(subscriptions::list_subscriptions).post(subscriptions::create_subscription),
        )
        .route(
            "/subscriptions/:id",
            get(subscriptions::get_subscription).delete(subscriptions::delete_subscription),
        );

    with_middleware(Router::new().nest(O2_BASE_PATH, api), config).with_state(state)
}

/// Create the management router.
///
/// # Routes
///
/// - `GET /health` - Health check
/// - `GET /ready` - Readiness check
/// - `GET /api/v1/oclouds` - List O-Clouds
/// - `PUT /api/v1/oclouds/:name` - Create or replace an O-Cloud spec
/// - `GET /api/v1/oclouds/:name` - Get an O-Cloud with status
/// - `DELETE /api/v1/oclouds/:name` - Delete an O-Cloud
/// - `GET /api/v1/telemetry?limit=` - Recent telemetry samples
/// - `POST /api/v1/orchestrations` - Start a deployment workflow
/// - `GET /api/v1/orchestrations` - List workflows
/// - `GET /api/v1/orchestrations/:id` - Get a workflow
/// - `GET /api/v1/agents` - Registered sub-agents
pub fn create_management_router<S>(state: GatewayState<S>) -> Router
where
    S: Store + 'static,
{
    let config = state.config.clone();
    let state = Arc::new(state);

    let router = Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready::<S>))
        // O-Clouds
        .route("/api/v1/oclouds", get(oclouds::list_oclouds::<S>))
        .route(
            "/api/v1/oclouds/:name",
            get(oclouds::get_ocloud::<S>)
                .put(oclouds::put_ocloud::<S>)
                .delete(oclouds::delete_ocloud::<S>),
        )
        // Telemetry
        .route("/api/v1/telemetry", get(telemetry::get_telemetry::<S>))
        // Orchestrations
        .route(
            "/api/v1/orchestrations",
            get(orchestrations::list_workflows::<S>).post(orchestrations::submit::<S>),
        )
        .route(
            "/api/v1/orchestrations/:id",
            get(orchestrations::get_workflow::<S>),
        )
        // Agents
        .route("/api/v1/agents", get(agents::list_agents::<S>));

    with_middleware(router, &config).with_state(state)
}

fn with_middleware<T>(router: Router<T>, config: &GatewayConfig) -> Router<T>
where
    T: Clone + Send + Sync + 'static,
{
    router
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(&config.cors_origins))
        .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.request_timeout_seconds,
        )))
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
