//! Orchestrator configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Deadlines and backoff policy for a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Ceiling for the whole six-phase workflow (seconds).
    #[serde(default = "OrchestratorConfig::default_workflow_timeout_secs")]
    pub workflow_timeout_secs: u64,
    /// Ceiling for one phase, retries included (seconds).
    #[serde(default = "OrchestratorConfig::default_phase_timeout_secs")]
    pub phase_timeout_secs: u64,
    /// First retry delay (milliseconds).
    #[serde(default = "OrchestratorConfig::default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Growth factor between retries.
    #[serde(default = "OrchestratorConfig::default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    /// Largest retry delay (seconds).
    #[serde(default = "OrchestratorConfig::default_max_backoff_secs")]
    pub max_backoff_secs: u64,
    /// Finished workflows kept for lookup; older ones are pruned on submit.
    #[serde(default = "OrchestratorConfig::default_retained_workflows")]
    pub retained_workflows: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            workflow_timeout_secs: Self::default_workflow_timeout_secs(),
            phase_timeout_secs: Self::default_phase_timeout_secs(),
            initial_backoff_ms: Self::default_initial_backoff_ms(),
            backoff_multiplier: Self::default_backoff_multiplier(),
            max_backoff_secs: Self::default_max_backoff_secs(),
            retained_workflows: Self::default_retained_workflows(),
        }
    }
}

impl OrchestratorConfig {
    const fn default_workflow_timeout_secs() -> u64 {
        600
    }

    const fn default_phase_timeout_secs() -> u64 {
        120
    }

    const fn default_initial_backoff_ms() -> u64 {
        2000
    }

    const fn default_backoff_multiplier() -> f64 {
        2.0
    }

    const fn default_max_backoff_secs() -> u64 {
        30
    }

    const fn default_retained_workflows() -> usize {
        1000
    }

    /// Load overrides from `WORKFLOW_TIMEOUT_SECS`, `PHASE_TIMEOUT_SECS` and
    /// `RETAINED_WORKFLOWS`.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        let secs = |key: &str| std::env::var(key).ok().and_then(|v| v.parse::<u64>().ok());

        if let Some(v) = secs("WORKFLOW_TIMEOUT_SECS") {
            config.workflow_timeout_secs = v;
        }
        if let Some(v) = secs("PHASE_TIMEOUT_SECS") {
            config.phase_timeout_secs = v;
        }
        if let Some(v) = std::env::var("RETAINED_WORKFLOWS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
        {
            config.retained_workflows = v;
        }
        config
    }

    /// Whole-workflow deadline.
    #[must_use]
    pub const fn workflow_timeout(&self) -> Duration {
        Duration::from_secs(self.workflow_timeout_secs)
    }

    /// Per-phase deadline.
    #[must_use]
    pub const fn phase_timeout(&self) -> Duration {
        Duration::from_secs(self.phase_timeout_secs)
    }

    /// First retry delay.
    #[must_use]
    pub const fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    /// Retry delay cap.
    #[must_use]
    pub const fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.workflow_timeout(), Duration::from_secs(600));
        assert_eq!(config.phase_timeout(), Duration::from_secs(120));
        assert_eq!(config.initial_backoff(), Duration::from_secs(2));
        assert_eq!(config.max_backoff(), Duration::from_secs(30));
        assert!((config.backoff_multiplier - 2.0).abs() < f64::EPSILON);
        assert_eq!(config.retained_workflows, 1000);
    }
}
