//! Six-phase RIC deployment workflow.
//!
//! The orchestrator drives a [`DeploymentIntent`] through security baseline,
//! infrastructure provisioning, interface configuration, network-function
//! deployment, monitoring setup and validation, strictly in that order. Each
//! phase is handed to a registered sub-agent or, when none is registered, to a
//! [`Fallback`] retried with exponential backoff.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Orchestrator                             │
//! │   workflow deadline (10 min) · correlation ID · workflow table   │
//! └─────────────────────────────────────────────────────────────────┘
//!                  │ for each phase, in order
//!        ┌─────────┴──────────┐
//!        ▼                    ▼
//! ┌───────────────┐   ┌────────────────────────────────────────────┐
//! │ AgentRegistry │   │ retry_with_backoff (2s × 2, cap 30s, 2 min) │
//! │ Agent::process│   │        └─► Fallback::run (DefaultFallback)  │
//! └───────────────┘   └────────────────────────────────────────────┘
//!                                          │
//!                                          ▼
//!                              ┌──────────────────────┐
//!                              │   ResourceManager    │
//!                              └──────────────────────┘
//! ```
//!
//! The first failing phase stops the workflow and is reported as an
//! [`OrchestrationError`]. Completed phases are not rolled back.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ocloud_control::ResourceManager;
//! use ocloud_orchestrator::{
//!     AgentRegistry, DefaultFallback, DeploymentIntent, Orchestrator, OrchestratorConfig,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example(intent: DeploymentIntent) -> Result<(), Box<dyn std::error::Error>> {
//! let resources = Arc::new(ResourceManager::default());
//! let orchestrator = Orchestrator::new(
//!     Arc::new(AgentRegistry::new()),
//!     Arc::new(DefaultFallback::new(resources)),
//!     OrchestratorConfig::default(),
//! );
//!
//! let report = orchestrator.process(&intent, &CancellationToken::new()).await?;
//! println!("deployed {} under {}", report.intent, report.correlation_id);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod agent;
pub mod config;
pub mod error;
pub mod fallback;
pub mod intent;
pub mod orchestrator;
pub mod phase;
pub mod retry;

pub use agent::{Agent, AgentError, AgentInfo, AgentRegistry, AgentStatus};
pub use config::OrchestratorConfig;
pub use error::{OrchestrationError, PhaseFailure, Severity};
pub use fallback::{DefaultFallback, Fallback, WorkflowContext};
pub use intent::DeploymentIntent;
pub use orchestrator::{
    Orchestrator, WorkflowFailure, WorkflowRecord, WorkflowReport, WorkflowState,
};
pub use phase::Phase;

#[cfg(any(test, feature = "test-utils"))]
pub use agent::mock::{CallLog, RecordingAgent};
#[cfg(any(test, feature = "test-utils"))]
pub use fallback::mock::MockFallback;
