//! The phased deployment workflow.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use ocloud_control::ResourceAllocation;
use ocloud_core::CorrelationId;
use parking_lot::RwLock;
use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, Instrument};

use crate::agent::AgentRegistry;
use crate::config::OrchestratorConfig;
use crate::error::{OrchestrationError, PhaseFailure, Severity};
use crate::fallback::{Fallback, WorkflowContext};
use crate::intent::DeploymentIntent;
use crate::phase::Phase;
use crate::retry::retry_with_backoff;

/// Result of a successful workflow.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowReport {
    /// Correlation ID of the workflow.
    pub correlation_id: CorrelationId,
    /// Name of the deployed intent.
    pub intent: String,
    /// Phases that completed, in order.
    pub completed_phases: Vec<Phase>,
    /// Capacity reserved for the deployment.
    pub allocations: Vec<ResourceAllocation>,
    /// When the workflow started.
    pub started_at: DateTime<Utc>,
    /// When the last phase completed.
    pub finished_at: DateTime<Utc>,
}

/// Where a workflow is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowState {
    /// Phases are still executing.
    Running,
    /// All six phases completed.
    Succeeded,
    /// A phase failed.
    Failed,
    /// The caller cancelled the workflow.
    Cancelled,
}

/// Progress of one workflow, as reported to operators.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRecord {
    /// Correlation ID of the workflow.
    pub correlation_id: CorrelationId,
    /// Name of the intent.
    pub intent: String,
    /// Kind of the intent.
    pub kind: String,
    /// Current state.
    pub state: WorkflowState,
    /// Phase in flight, while running.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_phase: Option<Phase>,
    /// Phases that completed, in order.
    pub completed_phases: Vec<Phase>,
    /// When the workflow started.
    pub started_at: DateTime<Utc>,
    /// When the workflow stopped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Failure details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<WorkflowFailure>,
}

/// Summary of the error that stopped a workflow.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowFailure {
    /// Phase error code.
    pub code: String,
    /// Rendered error.
    pub message: String,
    /// Failure severity.
    pub severity: Severity,
    /// Whether the workflow may be resubmitted.
    pub retryable: bool,
}

/// Runs deployment intents through the six phases.
///
/// Each phase goes to the sub-agent registered under its agent name, or to
/// the fallback wrapped in exponential backoff when none is registered.
pub struct Orchestrator {
    agents: Arc<AgentRegistry>,
    fallback: Arc<dyn Fallback>,
    config: OrchestratorConfig,
    workflows: RwLock<HashMap<CorrelationId, WorkflowRecord>>,
}

impl Orchestrator {
    /// Create an orchestrator.
    #[must_use]
    pub fn new(
        agents: Arc<AgentRegistry>,
        fallback: Arc<dyn Fallback>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            agents,
            fallback,
            config,
            workflows: RwLock::new(HashMap::new()),
        }
    }

    /// The sub-agent registry.
    #[must_use]
    pub fn agents(&self) -> &Arc<AgentRegistry> {
        &self.agents
    }

    /// The orchestrator configuration.
    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Run `intent` through every phase under a fresh correlation ID.
    ///
    /// # Errors
    ///
    /// Returns the [`OrchestrationError`] of the first phase that failed.
    pub async fn process(
        &self,
        intent: &DeploymentIntent,
        cancel: &CancellationToken,
    ) -> Result<WorkflowReport, OrchestrationError> {
        let correlation_id = CorrelationId::generate();
        self.track_start(correlation_id, intent);
        self.execute(correlation_id, intent, cancel).await
    }

    /// Start `intent` in the background and return its correlation ID.
    ///
    /// The workflow is visible through [`Orchestrator::workflow`] as soon as
    /// this returns.
    pub fn submit(
        self: &Arc<Self>,
        intent: DeploymentIntent,
        cancel: CancellationToken,
    ) -> CorrelationId {
        let correlation_id = CorrelationId::generate();
        self.track_start(correlation_id, &intent);

        let orchestrator = Arc::clone(self);
        tokio::spawn(async move {
            // Failures are already recorded in the workflow table.
            if let Err(e) = orchestrator.execute(correlation_id, &intent, &cancel).await {
                debug!(correlation_id = %correlation_id, error = %e, "Background workflow ended");
            }
        });
        correlation_id
    }

    /// Look up a workflow.
    #[must_use]
    pub fn workflow(&self, correlation_id: &CorrelationId) -> Option<WorkflowRecord> {
        self.workflows.read().get(correlation_id).cloned()
    }

    /// Every known workflow, oldest first.
    #[must_use]
    pub fn workflows(&self) -> Vec<WorkflowRecord> {
        let mut records: Vec<_> = self.workflows.read().values().cloned().collect();
        records.sort_by_key(|r| r.started_at);
        records
    }

    async fn execute(
        &self,
        correlation_id: CorrelationId,
        intent: &DeploymentIntent,
        cancel: &CancellationToken,
    ) -> Result<WorkflowReport, OrchestrationError> {
        let span = info_span!(
            "workflow",
            intent = %intent.name(),
            kind = %intent.kind,
            correlation_id = %correlation_id
        );
        self.run_phases(correlation_id, intent, cancel)
            .instrument(span)
            .await
    }

    async fn run_phases(
        &self,
        correlation_id: CorrelationId,
        intent: &DeploymentIntent,
        cancel: &CancellationToken,
    ) -> Result<WorkflowReport, OrchestrationError> {
        info!("Starting deployment workflow");
        let started_at = Utc::now();
        let ctx = WorkflowContext::new(correlation_id, intent.clone());
        let deadline = Instant::now() + self.config.workflow_timeout();
        let mut completed = Vec::with_capacity(Phase::ALL.len());

        for phase in Phase::ALL {
            self.update(correlation_id, |r| r.current_phase = Some(phase));
            info!(phase = %phase, "Starting phase");

            let outcome = tokio::time::timeout_at(deadline, self.run_phase(phase, &ctx, cancel))
                .await
                .unwrap_or_else(|_| {
                    Err(PhaseFailure::WorkflowTimedOut(self.config.workflow_timeout()))
                });

            if let Err(failure) = outcome {
                let err = OrchestrationError::from_phase(phase, failure, &intent.kind, correlation_id);
                error!(
                    phase = %phase,
                    code = %err.code,
                    severity = %err.severity,
                    retryable = err.retryable,
                    error = %err,
                    "Deployment workflow failed"
                );
                self.track_failure(&err);
                return Err(err);
            }

            info!(phase = %phase, "Phase completed");
            completed.push(phase);
            self.update(correlation_id, |r| r.completed_phases.push(phase));
        }

        let finished_at = Utc::now();
        self.update(correlation_id, |r| {
            r.state = WorkflowState::Succeeded;
            r.current_phase = None;
            r.finished_at = Some(finished_at);
        });
        info!("Deployment workflow completed");

        Ok(WorkflowReport {
            correlation_id,
            intent: intent.name().to_string(),
            completed_phases: completed,
            allocations: ctx.allocations(),
            started_at,
            finished_at,
        })
    }

    async fn run_phase(
        &self,
        phase: Phase,
        ctx: &WorkflowContext,
        cancel: &CancellationToken,
    ) -> Result<(), PhaseFailure> {
        if cancel.is_cancelled() {
            return Err(PhaseFailure::Cancelled);
        }

        let Some(agent) = self.agents.get(phase.agent_name()) else {
            return retry_with_backoff(&self.config, cancel, phase.name(), || {
                self.fallback.run(phase, ctx)
            })
            .await;
        };

        debug!(phase = %phase, agent = phase.agent_name(), "Delegating phase to sub-agent");
        let phase_timeout = self.config.phase_timeout();
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(PhaseFailure::Cancelled),
            result = tokio::time::timeout(phase_timeout, agent.process(&ctx.intent)) => match result {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(PhaseFailure::Agent {
                    agent: phase.agent_name().to_string(),
                    message: e.0,
                }),
                Err(_) => Err(PhaseFailure::TimedOut {
                    after: phase_timeout,
                    last_error: None,
                }),
            },
        }
    }

    fn track_start(&self, correlation_id: CorrelationId, intent: &DeploymentIntent) {
        let record = WorkflowRecord {
            correlation_id,
            intent: intent.name().to_string(),
            kind: intent.kind.clone(),
            state: WorkflowState::Running,
            current_phase: None,
            completed_phases: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
            error: None,
        };
        let mut workflows = self.workflows.write();
        prune_finished(&mut workflows, self.config.retained_workflows);
        workflows.insert(correlation_id, record);
    }

    fn track_failure(&self, err: &OrchestrationError) {
        let state = if err.is_cancelled() {
            WorkflowState::Cancelled
        } else {
            WorkflowState::Failed
        };
        let failure = WorkflowFailure {
            code: err.code.clone(),
            message: err.to_string(),
            severity: err.severity,
            retryable: err.retryable,
        };
        self.update(err.correlation_id, |r| {
            r.state = state;
            r.finished_at = Some(err.timestamp);
            r.error = Some(failure);
        });
    }

    fn update(&self, correlation_id: CorrelationId, f: impl FnOnce(&mut WorkflowRecord)) {
        if let Some(record) = self.workflows.write().get_mut(&correlation_id) {
            f(record);
        }
    }
}

/// Drop the oldest finished workflows until at most `retain` remain.
/// Running workflows are never dropped.
fn prune_finished(workflows: &mut HashMap<CorrelationId, WorkflowRecord>, retain: usize) {
    let mut finished: Vec<_> = workflows
        .values()
        .filter_map(|r| r.finished_at.map(|at| (at, r.correlation_id)))
        .collect();
    if finished.len() <= retain {
        return;
    }
    finished.sort_unstable();
    let excess = finished.len() - retain;
    for (_, id) in finished.into_iter().take(excess) {
        workflows.remove(&id);
    }
    debug!(pruned = excess, "Pruned finished workflows");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::mock::{CallLog, RecordingAgent};
    use crate::fallback::mock::MockFallback;
    use crate::fallback::DefaultFallback;
    use ocloud_control::ResourceManager;
    use ocloud_store::{ResourceCapacity, ResourcePoolSpec};
    use std::time::Duration;

    fn intent() -> DeploymentIntent {
        let mut intent = DeploymentIntent {
            kind: "RICDeployment".to_string(),
            ..DeploymentIntent::default()
        };
        intent.metadata.name = "ric-east".to_string();
        intent
    }

    fn registry_with_all_agents(log: &CallLog) -> Arc<AgentRegistry> {
        let registry = Arc::new(AgentRegistry::new());
        for phase in Phase::ALL {
            registry.register(
                phase.agent_name(),
                Arc::new(RecordingAgent::new(phase.agent_name(), log.clone())),
            );
        }
        registry
    }

    fn orchestrator(agents: Arc<AgentRegistry>, fallback: Arc<dyn Fallback>) -> Orchestrator {
        Orchestrator::new(agents, fallback, OrchestratorConfig::default())
    }

    #[tokio::test]
    async fn agents_run_in_phase_order() {
        let log = CallLog::default();
        let orch = orchestrator(registry_with_all_agents(&log), Arc::new(MockFallback::new()));

        let report = orch
            .process(&intent(), &CancellationToken::new())
            .await
            .unwrap();

        let expected: Vec<String> = Phase::ALL.iter().map(|p| p.agent_name().to_string()).collect();
        assert_eq!(*log.lock(), expected);
        assert_eq!(report.completed_phases, Phase::ALL.to_vec());

        let record = orch.workflow(&report.correlation_id).unwrap();
        assert_eq!(record.state, WorkflowState::Succeeded);
        assert!(record.current_phase.is_none());
        assert!(record.finished_at.is_some());
    }

    #[tokio::test]
    async fn failure_at_phase_three_stops_the_workflow() {
        let log = CallLog::default();
        let agents = registry_with_all_agents(&log);
        agents.register(
            Phase::InterfaceConfiguration.agent_name(),
            Arc::new(
                RecordingAgent::new(Phase::InterfaceConfiguration.agent_name(), log.clone())
                    .failing("E2 endpoint unreachable"),
            ),
        );
        let orch = orchestrator(agents, Arc::new(MockFallback::new()));

        let err = orch
            .process(&intent(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(log.lock().len(), 3);
        assert_eq!(err.code, "INTERFACE_CONFIG_FAILED");
        assert_eq!(err.phase, Phase::InterfaceConfiguration);
        assert_eq!(err.intent, "RICDeployment");
        assert!(err.retryable);
        assert_eq!(err.severity, Severity::Error);
        assert!(err.to_string().ends_with("agent oran-interface failed: E2 endpoint unreachable"));

        let record = orch.workflow(&err.correlation_id).unwrap();
        assert_eq!(record.state, WorkflowState::Failed);
        assert_eq!(
            record.completed_phases,
            vec![Phase::SecurityBaseline, Phase::InfrastructureProvisioning]
        );
        assert_eq!(record.error.unwrap().code, "INTERFACE_CONFIG_FAILED");
    }

    #[tokio::test]
    async fn validation_failure_is_critical() {
        let fallback = Arc::new(MockFallback::new());
        fallback.fail_permanently(Phase::Validation, "smoke test failed");
        let orch = orchestrator(Arc::new(AgentRegistry::new()), fallback.clone());

        let err = orch
            .process(&intent(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.code, "VALIDATION_FAILED");
        assert!(!err.retryable);
        assert_eq!(err.severity, Severity::Critical);
        assert_eq!(fallback.calls(), Phase::ALL.to_vec());
    }

    #[tokio::test]
    async fn other_phase_failures_are_retryable() {
        for phase in &Phase::ALL[..5] {
            let fallback = Arc::new(MockFallback::new());
            fallback.fail_permanently(*phase, "forced");
            let orch = orchestrator(Arc::new(AgentRegistry::new()), fallback);

            let err = orch
                .process(&intent(), &CancellationToken::new())
                .await
                .unwrap_err();
            assert!(err.retryable, "{phase} should be retryable");
            assert_eq!(err.phase, *phase);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fallback_retries_transient_failures() {
        let fallback = Arc::new(MockFallback::new());
        fallback.fail_transiently(Phase::MonitoringSetup, 2);
        let orch = orchestrator(Arc::new(AgentRegistry::new()), fallback.clone());

        orch.process(&intent(), &CancellationToken::new())
            .await
            .unwrap();

        let monitoring_attempts = fallback
            .calls()
            .into_iter()
            .filter(|p| *p == Phase::MonitoringSetup)
            .count();
        assert_eq!(monitoring_attempts, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_aborts_backoff_and_is_reported() {
        let fallback = Arc::new(MockFallback::new());
        fallback.fail_transiently(Phase::SecurityBaseline, u32::MAX);
        let orch = orchestrator(Arc::new(AgentRegistry::new()), fallback.clone());

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let err = orch.process(&intent(), &cancel).await.unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(err.phase, Phase::SecurityBaseline);
        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(!fallback.calls().contains(&Phase::InfrastructureProvisioning));
        assert_eq!(
            orch.workflow(&err.correlation_id).unwrap().state,
            WorkflowState::Cancelled
        );
    }

    #[tokio::test(start_paused = true)]
    async fn slow_agent_hits_the_phase_deadline() {
        let log = CallLog::default();
        let agents = Arc::new(AgentRegistry::new());
        agents.register(
            Phase::SecurityBaseline.agent_name(),
            Arc::new(
                RecordingAgent::new("slow", log).with_delay(Duration::from_secs(600)),
            ),
        );
        let orch = orchestrator(agents, Arc::new(MockFallback::new()));

        let err = orch
            .process(&intent(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err.failure(),
            Some(PhaseFailure::TimedOut { after, .. }) if *after == Duration::from_secs(120)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn workflow_deadline_bounds_all_phases() {
        let fallback = Arc::new(MockFallback::new());
        fallback.fail_transiently(Phase::NetworkFunctionDeployment, u32::MAX);
        let config = OrchestratorConfig {
            workflow_timeout_secs: 60,
            ..OrchestratorConfig::default()
        };
        let orch = Orchestrator::new(Arc::new(AgentRegistry::new()), fallback, config);

        let err = orch
            .process(&intent(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.phase, Phase::NetworkFunctionDeployment);
        assert!(matches!(err.failure(), Some(PhaseFailure::WorkflowTimedOut(_))));
    }

    #[tokio::test]
    async fn default_fallback_deploys_into_the_target_pool() {
        let resources = Arc::new(ResourceManager::default());
        resources
            .ensure_resource_pool(&ResourcePoolSpec {
                name: "edge-1".to_string(),
                pool_type: "compute".to_string(),
                location: "site-a".to_string(),
                capacity: ResourceCapacity {
                    cpu: "16".to_string(),
                    memory: "32Gi".to_string(),
                    storage: "1Ti".to_string(),
                    network: String::new(),
                },
                labels: Default::default(),
            })
            .unwrap();
        let orch = orchestrator(
            Arc::new(AgentRegistry::new()),
            Arc::new(DefaultFallback::new(Arc::clone(&resources))),
        );

        let mut intent = intent();
        intent.spec.target_pool = "edge-1".to_string();
        intent.spec.platform.resources.cpu = "8".to_string();
        intent.spec.platform.resources.memory = "16Gi".to_string();

        let report = orch
            .process(&intent, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.allocations.len(), 1);
        assert_eq!(report.allocations[0].cpu, 8);
        assert_eq!(resources.get_pool_status("edge-1").unwrap().available_cpu, 8);
    }

    #[tokio::test]
    async fn submit_tracks_background_workflows() {
        let log = CallLog::default();
        let orch = Arc::new(orchestrator(
            registry_with_all_agents(&log),
            Arc::new(MockFallback::new()),
        ));

        let id = orch.submit(intent(), CancellationToken::new());
        assert!(orch.workflow(&id).is_some());

        for _ in 0..100 {
            if orch.workflow(&id).unwrap().state == WorkflowState::Succeeded {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(orch.workflow(&id).unwrap().state, WorkflowState::Succeeded);
        assert_eq!(orch.workflows().len(), 1);
    }

    #[tokio::test]
    async fn submit_records_background_failures() {
        let log = CallLog::default();
        let agents = registry_with_all_agents(&log);
        agents.register(
            Phase::SecurityBaseline.agent_name(),
            Arc::new(
                RecordingAgent::new(Phase::SecurityBaseline.agent_name(), log.clone())
                    .failing("policy store offline"),
            ),
        );
        let orch = Arc::new(orchestrator(agents, Arc::new(MockFallback::new())));

        let id = orch.submit(intent(), CancellationToken::new());

        for _ in 0..500 {
            if orch.workflow(&id).unwrap().state != WorkflowState::Running {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let record = orch.workflow(&id).unwrap();
        assert_eq!(record.state, WorkflowState::Failed);
        assert!(record.finished_at.is_some());
        assert!(record.completed_phases.is_empty());
        assert!(record.error.is_some());
    }

    #[tokio::test]
    async fn finished_workflows_are_pruned_on_start() {
        let log = CallLog::default();
        let config = OrchestratorConfig {
            retained_workflows: 2,
            ..OrchestratorConfig::default()
        };
        let orch = Orchestrator::new(
            registry_with_all_agents(&log),
            Arc::new(MockFallback::new()),
            config,
        );

        let mut ids = Vec::new();
        for _ in 0..4 {
            let report = orch
                .process(&intent(), &CancellationToken::new())
                .await
                .unwrap();
            ids.push(report.correlation_id);
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        // Pruning runs before each insert, so the latest run sits on top of the cap.
        assert_eq!(orch.workflows().len(), 3);
        assert!(orch.workflow(&ids[0]).is_none());
        assert!(ids[1..].iter().all(|id| orch.workflow(id).is_some()));
    }

    #[test]
    fn running_workflows_survive_pruning() {
        let mut workflows = HashMap::new();
        let mut running = WorkflowRecord {
            correlation_id: CorrelationId::generate(),
            intent: "ric-east".to_string(),
            kind: "RICDeployment".to_string(),
            state: WorkflowState::Running,
            current_phase: None,
            completed_phases: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
            error: None,
        };
        workflows.insert(running.correlation_id, running.clone());
        running.correlation_id = CorrelationId::generate();
        running.state = WorkflowState::Succeeded;
        running.finished_at = Some(Utc::now());
        workflows.insert(running.correlation_id, running);

        prune_finished(&mut workflows, 0);

        assert_eq!(workflows.len(), 1);
        assert!(workflows.values().all(|r| r.state == WorkflowState::Running));
    }
}
