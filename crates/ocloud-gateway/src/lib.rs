//! HTTP gateway for the O-Cloud control plane.
//!
//! This crate serves two APIs:
//!
//! - The O2 IMS interface (`/o2ims/v1`) that SMOs use to inspect pools,
//!   inventory and alarms, started by the reconciler through [`O2Server`]
//! - The management API for declaring O-Clouds and submitting deployment
//!   intents to the orchestrator
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────┐        ┌───────────────────────────┐
//! │      SMO / O2 clients     │        │    Operators / tooling    │
//! └───────────────────────────┘        └───────────────────────────┘
//!               │ bearer token                       │
//!               ▼                                    ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        ocloud-gateway                           │
//! │  ┌────────────────────────┐     ┌────────────────────────────┐  │
//! │  │ O2 router + O2Caller   │     │ Management router          │  │
//! │  │ O2Store (records)      │     │ (oclouds, orchestrations)  │  │
//! │  └────────────────────────┘     └────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//!               │                                    │
//!               ▼                     ┌──────────────┼──────────────┐
//!        ┌──────────────┐             ▼              ▼              ▼
//!        │ Resource     │      ┌────────────┐ ┌─────────────┐ ┌──────────┐
//!        │ Manager      │◄─────│ Reconciler │ │Orchestrator │ │  Store   │
//!        └──────────────┘      └────────────┘ └─────────────┘ └──────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ocloud_auth::HmacJwtValidator;
//! use ocloud_control::ResourceManager;
//! use ocloud_gateway::{create_o2_router, GatewayConfig, O2State};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = GatewayConfig::default();
//! let resources = Arc::new(ResourceManager::default());
//! let validator = Arc::new(HmacJwtValidator::new(&config.auth_config()));
//! let state = Arc::new(O2State::new(resources, validator));
//!
//! let app = create_o2_router(state, &config);
//!
//! let listener = tokio::net::TcpListener::bind(&config.o2_listen_addr).await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod o2_server;
pub mod o2_store;
pub mod routes;
pub mod state;

pub use config::GatewayConfig;
pub use error::ApiError;
pub use o2_server::O2Server;
pub use routes::{create_management_router, create_o2_router};
pub use state::{GatewayState, O2State};

// Re-export key types for convenience
pub use auth::O2Caller;
pub use o2_store::O2Store;
