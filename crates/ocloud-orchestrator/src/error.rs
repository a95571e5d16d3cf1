//! Error types for the orchestrator.
//!
//! A phase reports a [`PhaseFailure`]; the orchestrator wraps it in an
//! [`OrchestrationError`] that carries the phase code, the workflow's
//! correlation ID and the retry classification.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use ocloud_control::ControlError;
use ocloud_core::CorrelationId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::phase::Phase;

/// Component name stamped on every orchestration error.
pub const COMPONENT: &str = "ORanOrchestrator";

/// Resource name stamped on every orchestration error.
pub const RESOURCE: &str = "ric-deployment";

/// How bad a failure is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational.
    Info,
    /// Degraded but progressing.
    Warning,
    /// The workflow failed.
    Error,
    /// The workflow failed and must not be retried.
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        })
    }
}

/// Why a single phase did not complete.
#[derive(Debug, Error)]
pub enum PhaseFailure {
    /// The caller cancelled the workflow.
    #[error("workflow cancelled")]
    Cancelled,

    /// The phase ran past its deadline.
    #[error("timed out after {after:?}{}", last_error_suffix(.last_error))]
    TimedOut {
        /// The deadline that expired.
        after: Duration,
        /// The last transient error seen before the deadline, if any.
        last_error: Option<String>,
    },

    /// The whole workflow ran past its deadline.
    #[error("workflow deadline of {0:?} exceeded")]
    WorkflowTimedOut(Duration),

    /// A control plane call failed.
    #[error(transparent)]
    Control(#[from] ControlError),

    /// A registered sub-agent reported a failure.
    #[error("agent {agent} failed: {message}")]
    Agent {
        /// The agent name.
        agent: String,
        /// What it reported.
        message: String,
    },

    /// The intent or the deployed state failed a check.
    #[error("validation failed: {0}")]
    Validation(String),
}

fn last_error_suffix(last_error: &Option<String>) -> String {
    last_error
        .as_ref()
        .map(|e| format!(" (last error: {e})"))
        .unwrap_or_default()
}

impl PhaseFailure {
    /// Whether retrying the same phase cannot help.
    ///
    /// Capacity, not-found and malformed-input errors from the control plane are
    /// permanent, as are validation failures and cancellation.
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        match self {
            Self::Cancelled | Self::WorkflowTimedOut(_) | Self::Validation(_) => true,
            Self::Control(e) => !e.is_retriable(),
            Self::TimedOut { .. } | Self::Agent { .. } => false,
        }
    }
}

/// A structured workflow failure.
///
/// Created once at the failing phase boundary and never mutated afterwards.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestrationError {
    /// Phase-specific error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Component that raised the error.
    pub component: String,
    /// Kind of the intent being processed.
    pub intent: String,
    /// Resource the workflow manages.
    pub resource: String,
    /// Severity.
    pub severity: Severity,
    /// Correlation ID shared by the workflow.
    pub correlation_id: CorrelationId,
    /// When the error was raised.
    pub timestamp: DateTime<Utc>,
    /// Whether the caller may retry the workflow.
    pub retryable: bool,
    /// The failing phase.
    pub phase: Phase,
    /// Rendered underlying cause.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    #[serde(skip)]
    source: Option<PhaseFailure>,
}

impl OrchestrationError {
    /// Wrap a phase failure with the phase's code, message and classification.
    #[must_use]
    pub fn from_phase(
        phase: Phase,
        failure: PhaseFailure,
        intent: impl Into<String>,
        correlation_id: CorrelationId,
    ) -> Self {
        Self {
            code: phase.error_code().to_string(),
            message: phase.failure_message().to_string(),
            component: COMPONENT.to_string(),
            intent: intent.into(),
            resource: RESOURCE.to_string(),
            severity: phase.severity(),
            correlation_id,
            timestamp: Utc::now(),
            retryable: phase.is_retryable(),
            phase,
            cause: Some(failure.to_string()),
            source: Some(failure),
        }
    }

    /// The underlying phase failure.
    #[must_use]
    pub fn failure(&self) -> Option<&PhaseFailure> {
        self.source.as_ref()
    }

    /// Whether the workflow was stopped by cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self.source, Some(PhaseFailure::Cancelled))
    }
}

impl fmt::Display for OrchestrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {} (intent: {}, resource: {}, correlation: {})",
            self.code, self.component, self.message, self.intent, self.resource, self.correlation_id
        )?;
        if let Some(cause) = &self.cause {
            write!(f, " - {cause}")?;
        }
        Ok(())
    }
}

impl std::error::Error for OrchestrationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}
