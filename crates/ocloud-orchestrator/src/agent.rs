//! Sub-agents and their registry.
//!
//! A sub-agent takes over one workflow phase. Agents are registered under the
//! phase's agent name (see [`Phase::agent_name`](crate::Phase::agent_name));
//! phases without a registered agent run the fallback instead.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::intent::DeploymentIntent;

/// A failure reported by a sub-agent.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct AgentError(pub String);

/// Health reported by a sub-agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStatus {
    /// Agent name.
    pub name: String,
    /// Whether the agent can take work.
    pub healthy: bool,
    /// When the agent last reported in.
    pub last_seen: DateTime<Utc>,
}

/// A pluggable phase implementation.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Carry out the agent's phase for `intent`.
    ///
    /// # Errors
    ///
    /// Returns an error if the phase could not be completed.
    async fn process(&self, intent: &DeploymentIntent) -> Result<(), AgentError>;

    /// Report the agent's health.
    ///
    /// # Errors
    ///
    /// Returns an error if the agent cannot be reached.
    async fn status(&self) -> Result<AgentStatus, AgentError>;

    /// What the agent can do.
    fn capabilities(&self) -> Vec<String>;
}

/// Registry entry as reported to operators.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentInfo {
    /// Name the agent is registered under.
    pub name: String,
    /// Declared capabilities.
    pub capabilities: Vec<String>,
    /// Whether the last status check succeeded and reported healthy.
    pub healthy: bool,
    /// When the agent last reported in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
    /// Status check failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Named sub-agents, guarded by their own lock.
#[derive(Default)]
pub struct AgentRegistry {
    agents: RwLock<BTreeMap<String, Arc<dyn Agent>>>,
}

impl AgentRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `agent` under `name`, replacing any previous registration.
    ///
    /// Returns the agent that was replaced.
    pub fn register(&self, name: impl Into<String>, agent: Arc<dyn Agent>) -> Option<Arc<dyn Agent>> {
        let name = name.into();
        info!(
            agent = %name,
            capabilities = ?agent.capabilities(),
            "Registered sub-agent"
        );
        self.agents.write().insert(name, agent)
    }

    /// Remove the agent registered under `name`.
    pub fn unregister(&self, name: &str) -> Option<Arc<dyn Agent>> {
        let removed = self.agents.write().remove(name);
        if removed.is_some() {
            info!(agent = %name, "Unregistered sub-agent");
        }
        removed
    }

    /// Look up an agent.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Agent>> {
        self.agents.read().get(name).cloned()
    }

    /// Registered agent names, sorted.
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        self.agents.read().keys().cloned().collect()
    }

    /// Number of registered agents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.agents.read().len()
    }

    /// Whether no agent is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agents.read().is_empty()
    }

    /// Check every agent's status.
    ///
    /// The lock is released before any agent is called.
    pub async fn statuses(&self) -> Vec<AgentInfo> {
        let agents: Vec<(String, Arc<dyn Agent>)> = self
            .agents
            .read()
            .iter()
            .map(|(name, agent)| (name.clone(), Arc::clone(agent)))
            .collect();

        let mut infos = Vec::with_capacity(agents.len());
        for (name, agent) in agents {
            let capabilities = agent.capabilities();
            let info = match agent.status().await {
                Ok(status) => AgentInfo {
                    name,
                    capabilities,
                    healthy: status.healthy,
                    last_seen: Some(status.last_seen),
                    error: None,
                },
                Err(e) => {
                    warn!(agent = %name, error = %e, "Sub-agent status check failed");
                    AgentInfo {
                        name,
                        capabilities,
                        healthy: false,
                        last_seen: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            infos.push(info);
        }
        infos
    }
}

/// Mock agents for testing.
#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use super::*;
    use parking_lot::Mutex;
    use std::time::Duration;

    /// Shared log of agent invocations, in call order.
    pub type CallLog = Arc<Mutex<Vec<String>>>;

    /// An agent that appends its name to a shared log when invoked.
    pub struct RecordingAgent {
        name: String,
        log: CallLog,
        failure: Mutex<Option<String>>,
        delay: Option<Duration>,
        healthy: bool,
    }

    impl RecordingAgent {
        /// Create an agent that records into `log` and succeeds.
        #[must_use]
        pub fn new(name: impl Into<String>, log: CallLog) -> Self {
            Self {
                name: name.into(),
                log,
                failure: Mutex::new(None),
                delay: None,
                healthy: true,
            }
        }

        /// Fail every call with `message`.
        #[must_use]
        pub fn failing(self, message: impl Into<String>) -> Self {
            *self.failure.lock() = Some(message.into());
            self
        }

        /// Sleep for `delay` before answering.
        #[must_use]
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        /// Report unhealthy from `status`.
        #[must_use]
        pub fn unhealthy(mut self) -> Self {
            self.healthy = false;
            self
        }
    }

    #[async_trait]
    impl Agent for RecordingAgent {
        async fn process(&self, _intent: &DeploymentIntent) -> Result<(), AgentError> {
            self.log.lock().push(self.name.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            match self.failure.lock().clone() {
                Some(message) => Err(AgentError(message)),
                None => Ok(()),
            }
        }

        async fn status(&self) -> Result<AgentStatus, AgentError> {
            Ok(AgentStatus {
                name: self.name.clone(),
                healthy: self.healthy,
                last_seen: Utc::now(),
            })
        }

        fn capabilities(&self) -> Vec<String> {
            vec![self.name.clone()]
        }
    }

    /// An agent whose status check always fails.
    pub struct UnreachableAgent;

    #[async_trait]
    impl Agent for UnreachableAgent {
        async fn process(&self, _intent: &DeploymentIntent) -> Result<(), AgentError> {
            Err(AgentError("unreachable".into()))
        }

        async fn status(&self) -> Result<AgentStatus, AgentError> {
            Err(AgentError("connection refused".into()))
        }

        fn capabilities(&self) -> Vec<String> {
            Vec::new()
        }
    }
}
