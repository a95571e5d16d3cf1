//! The six workflow phases.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Severity;

/// One ordered step of a deployment workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    /// Security policies and admission requirements.
    SecurityBaseline,
    /// Capacity reservation in the target pool.
    InfrastructureProvisioning,
    /// E2, A1, O1 and O2 interface setup.
    InterfaceConfiguration,
    /// RIC platform components and xApps.
    NetworkFunctionDeployment,
    /// Metrics, dashboards, tracing and VES.
    MonitoringSetup,
    /// Post-deployment checks.
    Validation,
}

impl Phase {
    /// Every phase in execution order.
    pub const ALL: [Self; 6] = [
        Self::SecurityBaseline,
        Self::InfrastructureProvisioning,
        Self::InterfaceConfiguration,
        Self::NetworkFunctionDeployment,
        Self::MonitoringSetup,
        Self::Validation,
    ];

    /// Kebab-case name used in logs and on the wire.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SecurityBaseline => "security-baseline",
            Self::InfrastructureProvisioning => "infrastructure-provisioning",
            Self::InterfaceConfiguration => "interface-configuration",
            Self::NetworkFunctionDeployment => "network-function-deployment",
            Self::MonitoringSetup => "monitoring-setup",
            Self::Validation => "validation",
        }
    }

    /// Error code reported when the phase fails.
    #[must_use]
    pub const fn error_code(self) -> &'static str {
        match self {
            Self::SecurityBaseline => "SECURITY_BASELINE_FAILED",
            Self::InfrastructureProvisioning => "INFRASTRUCTURE_PROVISIONING_FAILED",
            Self::InterfaceConfiguration => "INTERFACE_CONFIG_FAILED",
            Self::NetworkFunctionDeployment => "NF_DEPLOYMENT_FAILED",
            Self::MonitoringSetup => "MONITORING_SETUP_FAILED",
            Self::Validation => "VALIDATION_FAILED",
        }
    }

    /// Human-readable failure message.
    #[must_use]
    pub const fn failure_message(self) -> &'static str {
        match self {
            Self::SecurityBaseline => "Failed to establish security baseline",
            Self::InfrastructureProvisioning => "Failed to provision infrastructure",
            Self::InterfaceConfiguration => "Failed to configure O-RAN interfaces",
            Self::NetworkFunctionDeployment => "Failed to deploy network functions",
            Self::MonitoringSetup => "Failed to setup monitoring",
            Self::Validation => "Failed to validate deployment",
        }
    }

    /// Name under which a sub-agent takes over this phase.
    #[must_use]
    pub const fn agent_name(self) -> &'static str {
        match self {
            Self::SecurityBaseline => "security-compliance",
            Self::InfrastructureProvisioning => "nephio-infrastructure",
            Self::InterfaceConfiguration => "oran-interface",
            Self::NetworkFunctionDeployment => "network-functions",
            Self::MonitoringSetup => "monitoring-analytics",
            Self::Validation => "testing-validation",
        }
    }

    /// Whether a failure of this phase may be retried by the caller.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        !matches!(self, Self::Validation)
    }

    /// Severity attached to a failure of this phase.
    #[must_use]
    pub const fn severity(self) -> Severity {
        match self {
            Self::Validation => Severity::Critical,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
