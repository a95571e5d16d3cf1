//! Built-in phase implementations used when no sub-agent is registered.

use std::sync::Arc;

use async_trait::async_trait;
use ocloud_control::{ResourceAllocation, ResourceManager, ResourceRequest};
use ocloud_core::CorrelationId;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::PhaseFailure;
use crate::intent::{DeploymentIntent, ResourceSpec};
use crate::phase::Phase;

/// State shared by the phases of one workflow.
pub struct WorkflowContext {
    /// Correlation ID of the workflow.
    pub correlation_id: CorrelationId,
    /// The intent being deployed.
    pub intent: DeploymentIntent,
    allocations: Mutex<Vec<ResourceAllocation>>,
}

impl WorkflowContext {
    /// Start a context for `intent`.
    #[must_use]
    pub fn new(correlation_id: CorrelationId, intent: DeploymentIntent) -> Self {
        Self {
            correlation_id,
            intent,
            allocations: Mutex::new(Vec::new()),
        }
    }

    /// Allocations granted so far.
    #[must_use]
    pub fn allocations(&self) -> Vec<ResourceAllocation> {
        self.allocations.lock().clone()
    }

    fn has_allocations(&self) -> bool {
        !self.allocations.lock().is_empty()
    }

    fn record_allocations(&self, granted: Vec<ResourceAllocation>) {
        self.allocations.lock().extend(granted);
    }
}

/// Strategy that runs a phase without a sub-agent.
///
/// The orchestrator retries transient failures with backoff, so an
/// implementation must tolerate being called again for the same phase.
#[async_trait]
pub trait Fallback: Send + Sync {
    /// Run `phase` for the workflow in `ctx`.
    ///
    /// # Errors
    ///
    /// Returns a permanent failure when retrying cannot help.
    async fn run(&self, phase: Phase, ctx: &WorkflowContext) -> Result<(), PhaseFailure>;
}

/// Fallback backed by the control plane's resource manager.
pub struct DefaultFallback {
    resources: Arc<ResourceManager>,
}

impl DefaultFallback {
    /// Create a fallback allocating from `resources`.
    #[must_use]
    pub fn new(resources: Arc<ResourceManager>) -> Self {
        Self { resources }
    }

    fn security_baseline(ctx: &WorkflowContext) -> Result<(), PhaseFailure> {
        let security = &ctx.intent.spec.security;
        if security.zero_trust && !security.mtls {
            return Err(PhaseFailure::Validation(
                "zero-trust requires mTLS between components".to_string(),
            ));
        }

        info!(
            zero_trust = security.zero_trust,
            mtls = security.mtls,
            image_signing = security.image_signing,
            runtime_scan = security.runtime_scan,
            compliance = ?security.compliance,
            "Security baseline established"
        );
        Ok(())
    }

    fn provision_infrastructure(&self, ctx: &WorkflowContext) -> Result<(), PhaseFailure> {
        if ctx.has_allocations() {
            debug!("Resources already allocated for this workflow");
            return Ok(());
        }

        let spec = &ctx.intent.spec;
        if spec.target_pool.is_empty() {
            return Err(PhaseFailure::Validation(
                "targetPool is required to provision infrastructure".to_string(),
            ));
        }

        let name = ctx.intent.name();
        let mut requests = vec![request(
            format!("{name}-platform"),
            &spec.target_pool,
            &spec.platform.resources,
        )?];
        for xapp in &spec.xapps {
            requests.push(request(
                format!("{name}-{}", xapp.name),
                &spec.target_pool,
                &xapp.resources,
            )?);
        }

        let mut granted = Vec::with_capacity(requests.len());
        for req in &requests {
            match self.resources.allocate_resources(req) {
                Ok(allocation) => granted.push(allocation),
                Err(e) => {
                    // All or nothing within one attempt.
                    self.release_all(&granted);
                    return Err(e.into());
                }
            }
        }

        info!(
            pool_name = %spec.target_pool,
            allocations = granted.len(),
            "Infrastructure provisioned"
        );
        ctx.record_allocations(granted);
        Ok(())
    }

    fn release_all(&self, allocations: &[ResourceAllocation]) {
        for allocation in allocations {
            if let Err(e) = self.resources.release_resources(&allocation.id) {
                warn!(allocation_id = %allocation.id, error = %e, "Failed to release allocation");
            }
        }
    }

    fn configure_interfaces(ctx: &WorkflowContext) -> Result<(), PhaseFailure> {
        for (name, interface) in ctx.intent.spec.interfaces.named() {
            if !interface.enabled {
                debug!(interface = name, "Interface disabled, skipping");
                continue;
            }
            if interface.version.is_empty() {
                return Err(PhaseFailure::Validation(format!(
                    "{name} interface is enabled without a version"
                )));
            }
            info!(
                interface = name,
                version = %interface.version,
                security = %interface.security,
                "Configured interface"
            );
        }
        Ok(())
    }

    fn deploy_network_functions(ctx: &WorkflowContext) -> Result<(), PhaseFailure> {
        let spec = &ctx.intent.spec;
        if let Some(unnamed) = spec.xapps.iter().position(|x| x.name.is_empty()) {
            return Err(PhaseFailure::Validation(format!(
                "xApp at index {unnamed} has no name"
            )));
        }

        info!(
            ric_type = %spec.ric_type,
            version = %spec.platform.version,
            components = ?spec.platform.components,
            ha = spec.platform.ha,
            "Deployed RIC platform"
        );
        for xapp in &spec.xapps {
            info!(xapp = %xapp.name, version = %xapp.version, image = %xapp.image, "Deployed xApp");
        }
        Ok(())
    }

    fn setup_monitoring(ctx: &WorkflowContext) {
        let monitoring = &ctx.intent.spec.monitoring;
        let enabled: Vec<&str> = [
            ("prometheus", monitoring.prometheus),
            ("grafana", monitoring.grafana),
            ("jaeger", monitoring.jaeger),
            ("ves", monitoring.ves),
        ]
        .into_iter()
        .filter_map(|(name, on)| on.then_some(name))
        .collect();

        if enabled.is_empty() {
            warn!("No monitoring components enabled");
        } else {
            info!(components = ?enabled, "Monitoring configured");
        }
    }

    fn validate(&self, ctx: &WorkflowContext) -> Result<(), PhaseFailure> {
        let allocations = ctx.allocations();
        if allocations.is_empty() {
            return Err(PhaseFailure::Validation(
                "no resources were allocated".to_string(),
            ));
        }
        for allocation in &allocations {
            if self.resources.get_allocation(&allocation.id).is_none() {
                return Err(PhaseFailure::Validation(format!(
                    "allocation {} for request {} is no longer active",
                    allocation.id, allocation.request_id
                )));
            }
        }
        info!(allocations = allocations.len(), "Deployment validated");
        Ok(())
    }
}

fn request(id: String, pool: &str, resources: &ResourceSpec) -> Result<ResourceRequest, PhaseFailure> {
    Ok(ResourceRequest::from_quantities(
        id,
        pool,
        &resources.cpu,
        &resources.memory,
        "",
    )?)
}

#[async_trait]
impl Fallback for DefaultFallback {
    async fn run(&self, phase: Phase, ctx: &WorkflowContext) -> Result<(), PhaseFailure> {
        match phase {
            Phase::SecurityBaseline => Self::security_baseline(ctx),
            Phase::InfrastructureProvisioning => self.provision_infrastructure(ctx),
            Phase::InterfaceConfiguration => Self::configure_interfaces(ctx),
            Phase::NetworkFunctionDeployment => Self::deploy_network_functions(ctx),
            Phase::MonitoringSetup => {
                Self::setup_monitoring(ctx);
                Ok(())
            }
            Phase::Validation => self.validate(ctx),
        }
    }
}

/// Mock fallbacks for testing.
#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use super::*;
    use std::collections::HashMap;

    /// A fallback that records phases and fails on demand.
    #[derive(Default)]
    pub struct MockFallback {
        calls: Mutex<Vec<Phase>>,
        transient: Mutex<HashMap<Phase, u32>>,
        permanent: Mutex<HashMap<Phase, String>>,
    }

    impl MockFallback {
        /// Create a fallback that succeeds for every phase.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Fail `phase` transiently `times` times before succeeding.
        pub fn fail_transiently(&self, phase: Phase, times: u32) {
            self.transient.lock().insert(phase, times);
        }

        /// Fail `phase` permanently with a validation error.
        pub fn fail_permanently(&self, phase: Phase, message: impl Into<String>) {
            self.permanent.lock().insert(phase, message.into());
        }

        /// Every phase attempt, in call order.
        #[must_use]
        pub fn calls(&self) -> Vec<Phase> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl Fallback for MockFallback {
        async fn run(&self, phase: Phase, _ctx: &WorkflowContext) -> Result<(), PhaseFailure> {
            self.calls.lock().push(phase);
            if let Some(message) = self.permanent.lock().get(&phase) {
                return Err(PhaseFailure::Validation(message.clone()));
            }
            let mut transient = self.transient.lock();
            if let Some(remaining) = transient.get_mut(&phase) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(PhaseFailure::Agent {
                        agent: "mock-fallback".to_string(),
                        message: format!("{phase} temporarily unavailable"),
                    });
                }
            }
            Ok(())
        }
    }
}
