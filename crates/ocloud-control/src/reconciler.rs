//! O-Cloud reconciliation.
//!
//! [`Reconciler::reconcile`] runs one cycle for one O-Cloud: SMO registration,
//! O2 interface, resource pools (allocator entries plus namespaces and
//! quotas), inventory and telemetry. The first failing step ends the cycle in
//! `Error`; otherwise it ends in `Ready`. Either way the status is written
//! back and the outcome says when to run again.
//!
//! [`ReconcileLoop`] keeps a requeue schedule per O-Cloud and reconciles
//! whatever is due on each tick.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use ocloud_cluster::ClusterProvisioner;
use ocloud_core::{AlarmId, CorrelationId};
use ocloud_store::{Condition, OCloud, OCloudStatus, ReconcilePhase, Store, StoreError};
use parking_lot::Mutex;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::error::{ControlError, Result};
use crate::lifecycle::{is_terminal, validate_transition};
use crate::o2::O2Interface;
use crate::resources::ResourceManager;
use crate::smo_client::{ResourceUpdate, SmoAlarm, SmoClient};
use crate::telemetry::TelemetryManager;
use crate::types::{ControlConfig, TelemetryMetrics};

/// SMO status when SMO integration is off.
pub const STATUS_DISABLED: &str = "Disabled";
/// SMO status when the health check failed.
pub const SMO_DISCONNECTED: &str = "Disconnected";
/// SMO status when registration was rejected.
pub const SMO_REGISTRATION_FAILED: &str = "Registration Failed";
/// SMO status after a successful registration.
pub const SMO_CONNECTED: &str = "Connected";
/// O2 status when the configuration was rejected.
pub const O2_INITIALIZATION_FAILED: &str = "Initialization Failed";
/// O2 status when the server did not start.
pub const O2_API_SERVER_FAILED: &str = "API Server Failed";
/// O2 status while the API is served.
pub const O2_ACTIVE: &str = "Active";
/// Status message after a successful cycle.
pub const MESSAGE_OPERATIONAL: &str = "O-Cloud is operational";

/// Result of one reconcile cycle.
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    /// Correlation ID the cycle logged under.
    pub correlation_id: CorrelationId,
    /// Phase the cycle ended in; `None` when the O-Cloud no longer exists.
    pub phase: Option<ReconcilePhase>,
    /// When to reconcile again; `None` means not at all.
    pub requeue_after: Option<Duration>,
}

/// Tracks the phase of the cycle in flight.
struct Cycle {
    phase: Option<ReconcilePhase>,
}

impl Cycle {
    fn start(previous: Option<ReconcilePhase>) -> Result<Self> {
        // A cycle interrupted mid-way restarts from scratch.
        let previous = previous.filter(|p| is_terminal(*p));
        let phase = validate_transition(previous, ReconcilePhase::Initializing)?;
        Ok(Self { phase: Some(phase) })
    }

    fn advance(&mut self, to: ReconcilePhase) -> Result<()> {
        let phase = validate_transition(self.phase, to)?;
        debug!(phase = %phase, "Entering phase");
        self.phase = Some(phase);
        Ok(())
    }
}

/// Drives one O-Cloud toward its declared state.
pub struct Reconciler<S: Store> {
    store: Arc<S>,
    resources: Arc<ResourceManager>,
    telemetry: Arc<TelemetryManager>,
    smo: Arc<dyn SmoClient>,
    o2: Arc<dyn O2Interface>,
    provisioner: Arc<dyn ClusterProvisioner>,
    config: ControlConfig,
}

impl<S: Store> Reconciler<S> {
    /// Create a reconciler over its collaborators.
    #[must_use]
    pub fn new(
        store: Arc<S>,
        resources: Arc<ResourceManager>,
        telemetry: Arc<TelemetryManager>,
        smo: Arc<dyn SmoClient>,
        o2: Arc<dyn O2Interface>,
        provisioner: Arc<dyn ClusterProvisioner>,
        config: ControlConfig,
    ) -> Self {
        Self {
            store,
            resources,
            telemetry,
            smo,
            o2,
            provisioner,
            config,
        }
    }

    /// Get a reference to the store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get a reference to the control config.
    #[must_use]
    pub fn config(&self) -> &ControlConfig {
        &self.config
    }

    /// Run one cycle for the named O-Cloud.
    ///
    /// Step failures do not surface here: they end the cycle in `Error` and
    /// schedule a retry.
    ///
    /// # Errors
    ///
    /// Returns an error if the O-Cloud cannot be read from the store.
    pub async fn reconcile(&self, name: &str) -> Result<ReconcileOutcome> {
        let correlation_id = CorrelationId::generate();
        let span = info_span!("reconcile", ocloud = %name, correlation_id = %correlation_id);
        self.reconcile_inner(name, correlation_id)
            .instrument(span)
            .await
    }

    async fn reconcile_inner(
        &self,
        name: &str,
        correlation_id: CorrelationId,
    ) -> Result<ReconcileOutcome> {
        info!("Starting O-Cloud reconciliation");

        let Some(ocloud) = self.store.get_ocloud(name)? else {
            debug!("O-Cloud not found, likely deleted");
            return Ok(ReconcileOutcome {
                correlation_id,
                phase: None,
                requeue_after: None,
            });
        };

        let mut status = ocloud.status.clone();
        let mut cycle = Cycle::start(status.phase)?;

        let (phase, message, requeue) = match self.run_steps(&ocloud, &mut status, &mut cycle).await
        {
            Ok(()) => {
                cycle.advance(ReconcilePhase::Ready)?;
                info!("O-Cloud reconciliation completed");
                (
                    ReconcilePhase::Ready,
                    MESSAGE_OPERATIONAL.to_string(),
                    self.config.success_requeue(),
                )
            }
            Err(StepFailure { prefix, error }) => {
                cycle.advance(ReconcilePhase::Error)?;
                error!(error = %error, "O-Cloud reconciliation failed");
                (
                    ReconcilePhase::Error,
                    format!("{prefix}: {error}"),
                    self.config.error_requeue(),
                )
            }
        };

        record_outcome(&mut status, phase, message);
        match self.store.update_status(name, &status) {
            Ok(()) => {}
            Err(StoreError::NotFound) => {
                debug!("O-Cloud deleted during reconciliation");
                return Ok(ReconcileOutcome {
                    correlation_id,
                    phase: None,
                    requeue_after: None,
                });
            }
            Err(e) => warn!(error = %e, "Failed to update O-Cloud status"),
        }

        Ok(ReconcileOutcome {
            correlation_id,
            phase: Some(phase),
            requeue_after: Some(requeue),
        })
    }

    async fn run_steps(
        &self,
        ocloud: &OCloud,
        status: &mut OCloudStatus,
        cycle: &mut Cycle,
    ) -> std::result::Result<(), StepFailure> {
        cycle.advance(ReconcilePhase::SmoReconciling).map_err(StepFailure::internal)?;
        self.reconcile_smo(ocloud, status)
            .await
            .map_err(|error| StepFailure::new("SMO reconciliation failed", error))?;

        cycle.advance(ReconcilePhase::O2Reconciling).map_err(StepFailure::internal)?;
        self.reconcile_o2(ocloud, status)
            .await
            .map_err(|error| StepFailure::new("O2 interface reconciliation failed", error))?;

        cycle.advance(ReconcilePhase::PoolReconciling).map_err(StepFailure::internal)?;
        self.reconcile_resource_pools(ocloud)
            .await
            .map_err(|error| StepFailure::new("Resource pool reconciliation failed", error))?;
        self.report_pools_upstream(ocloud).await;

        cycle.advance(ReconcilePhase::InventoryUpdating).map_err(StepFailure::internal)?;
        status.resource_inventory = self.resources.get_resource_inventory(&ocloud.spec.resource_pools);
        info!(
            total_cpu = status.resource_inventory.total_cpu,
            available_cpu = status.resource_inventory.available_cpu,
            "Resource inventory updated"
        );

        cycle.advance(ReconcilePhase::TelemetryCollecting).map_err(StepFailure::internal)?;
        self.collect_telemetry(ocloud, status);
        Ok(())
    }

    async fn reconcile_smo(&self, ocloud: &OCloud, status: &mut OCloudStatus) -> Result<()> {
        let smo = &ocloud.spec.smo;
        if !smo.enabled {
            debug!("SMO integration disabled");
            status.smo_status = STATUS_DISABLED.to_string();
            return Ok(());
        }

        if let Err(e) = self.smo.connect(smo).await {
            status.smo_status = SMO_DISCONNECTED.to_string();
            return Err(e);
        }
        if let Err(e) = self.smo.register_ocloud(smo, ocloud).await {
            status.smo_status = SMO_REGISTRATION_FAILED.to_string();
            return Err(e);
        }

        status.smo_status = SMO_CONNECTED.to_string();
        Ok(())
    }

    async fn reconcile_o2(&self, ocloud: &OCloud, status: &mut OCloudStatus) -> Result<()> {
        let o2 = &ocloud.spec.o2_interface;
        if !o2.enabled {
            debug!("O2 interface disabled");
            status.o2_status = STATUS_DISABLED.to_string();
            return Ok(());
        }

        if let Err(e) = self.o2.initialize(o2).await {
            status.o2_status = O2_INITIALIZATION_FAILED.to_string();
            return Err(e);
        }
        if let Err(e) = self.o2.start_api_server().await {
            status.o2_status = O2_API_SERVER_FAILED.to_string();
            return Err(e);
        }

        status.o2_status = O2_ACTIVE.to_string();
        Ok(())
    }

    async fn reconcile_resource_pools(&self, ocloud: &OCloud) -> Result<()> {
        info!(pool_count = ocloud.spec.resource_pools.len(), "Reconciling resource pools");

        for pool in &ocloud.spec.resource_pools {
            debug!(pool_name = %pool.name, pool_type = %pool.pool_type, "Processing resource pool");

            self.resources
                .ensure_resource_pool(pool)
                .map_err(|e| e.context(format!("failed to ensure resource pool {}", pool.name)))?;

            let scope = self
                .provisioner
                .ensure_pool_scope(pool)
                .await
                .map_err(|e| {
                    ControlError::from(e)
                        .context(format!("failed to provision scope for pool {}", pool.name))
                })?;
            debug!(pool_name = %pool.name, namespace = %scope.namespace, "Pool scope ensured");
        }

        info!("Resource pool reconciliation completed");
        Ok(())
    }

    /// Push pool snapshots and utilization alarms to the SMO. Failures only warn.
    async fn report_pools_upstream(&self, ocloud: &OCloud) {
        let smo = &ocloud.spec.smo;
        if !smo.enabled {
            return;
        }

        for pool in &ocloud.spec.resource_pools {
            let update = self
                .resources
                .get_pool_status(&pool.name)
                .and_then(|snapshot| {
                    serde_json::to_value(snapshot)
                        .map_err(|e| ControlError::Internal(format!("failed to encode pool: {e}")))
                })
                .map(|new_value| ResourceUpdate {
                    ocloud_id: ocloud.name.clone(),
                    resource_type: "resourcePool".to_string(),
                    resource_id: pool.name.clone(),
                    update_type: "updated".to_string(),
                    old_value: None,
                    new_value,
                    timestamp: Utc::now(),
                });

            let result = match update {
                Ok(update) => self.smo.report_resource_update(smo, &update).await,
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                warn!(pool_name = %pool.name, error = %e, "Failed to report resource update to SMO");
            }
        }

        let declared: HashSet<&str> = ocloud
            .spec
            .resource_pools
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        for warning in self
            .resources
            .optimize_resource_allocation()
            .into_iter()
            .filter(|w| declared.contains(w.pool_name.as_str()))
        {
            let alarm = SmoAlarm {
                id: AlarmId::generate().to_string(),
                alarm_type: "high-utilization".to_string(),
                severity: "warning".to_string(),
                source: warning.pool_name.clone(),
                description: format!(
                    "resource pool {} utilization above {}%",
                    warning.pool_name, warning.threshold
                ),
                details: BTreeMap::from([
                    ("ocloud".to_string(), ocloud.name.clone().into()),
                    ("cpuUtilization".to_string(), warning.cpu_utilization.into()),
                    ("memoryUtilization".to_string(), warning.memory_utilization.into()),
                ]),
                timestamp: Utc::now(),
                acknowledged: false,
            };
            if let Err(e) = self.smo.send_alarm(smo, &alarm).await {
                warn!(pool_name = %warning.pool_name, error = %e, "Failed to send alarm to SMO");
            }
        }
    }

    fn collect_telemetry(&self, ocloud: &OCloud, status: &OCloudStatus) {
        let inventory = &status.resource_inventory;
        let by_pool = self.resources.allocations_by_pool();
        let active_allocations = ocloud
            .spec
            .resource_pools
            .iter()
            .filter_map(|p| by_pool.get(&p.name))
            .sum();

        self.telemetry.record_metrics(TelemetryMetrics {
            timestamp: Utc::now(),
            ocloud_name: ocloud.name.clone(),
            resource_pools: ocloud.spec.resource_pools.len(),
            total_cpu: inventory.total_cpu,
            available_cpu: inventory.available_cpu,
            total_memory: inventory.total_memory,
            available_memory: inventory.available_memory,
            total_storage: inventory.total_storage,
            available_storage: inventory.available_storage,
            active_allocations,
            error_count: 0,
            warning_count: 0,
        });
    }
}

struct StepFailure {
    prefix: &'static str,
    error: ControlError,
}

impl StepFailure {
    fn new(prefix: &'static str, error: ControlError) -> Self {
        Self { prefix, error }
    }

    fn internal(error: ControlError) -> Self {
        Self::new("Reconciliation aborted", error)
    }
}

fn record_outcome(status: &mut OCloudStatus, phase: ReconcilePhase, message: String) {
    let now = Utc::now();
    let reason = match phase {
        ReconcilePhase::Ready => "ReconcileSucceeded",
        _ => "ReconcileFailed",
    };
    status.upsert_condition(Condition {
        condition_type: phase.as_str().to_string(),
        status: "True".to_string(),
        last_transition_time: now,
        reason: reason.to_string(),
        message: message.clone(),
    });
    status.phase = Some(phase);
    status.message = message;
    status.last_reconciled = Some(now);
}

/// Periodically reconciles every stored O-Cloud on its own requeue schedule.
pub struct ReconcileLoop<S: Store> {
    reconciler: Arc<Reconciler<S>>,
    schedule: Mutex<HashMap<String, Instant>>,
}

impl<S: Store + 'static> ReconcileLoop<S> {
    /// Create a loop around a reconciler.
    #[must_use]
    pub fn new(reconciler: Arc<Reconciler<S>>) -> Self {
        Self {
            reconciler,
            schedule: Mutex::new(HashMap::new()),
        }
    }

    /// Get the reconciler this loop drives.
    #[must_use]
    pub fn reconciler(&self) -> &Arc<Reconciler<S>> {
        &self.reconciler
    }

    /// Make the named O-Cloud due on the next tick.
    pub fn trigger(&self, name: &str) {
        self.schedule.lock().remove(name);
    }

    /// When the named O-Cloud is next due, if it has been reconciled before.
    #[must_use]
    pub fn next_due(&self, name: &str) -> Option<Instant> {
        self.schedule.lock().get(name).copied()
    }

    /// Reconcile every O-Cloud that is due, concurrently. Returns how many ran.
    ///
    /// # Errors
    ///
    /// Returns an error if the O-Clouds cannot be listed.
    pub async fn run_once(&self) -> Result<usize> {
        let now = Instant::now();
        let names: Vec<String> = self
            .reconciler
            .store()
            .list_oclouds()?
            .into_iter()
            .map(|o| o.name)
            .collect();

        let due: Vec<String> = {
            let mut schedule = self.schedule.lock();
            let live: HashSet<&str> = names.iter().map(String::as_str).collect();
            schedule.retain(|name, _| live.contains(name.as_str()));
            names
                .iter()
                .filter(|name| schedule.get(*name).map_or(true, |at| *at <= now))
                .cloned()
                .collect()
        };

        let results = join_all(due.iter().map(|name| self.reconciler.reconcile(name))).await;

        let error_requeue = self.reconciler.config().error_requeue();
        let mut schedule = self.schedule.lock();
        for (name, result) in due.iter().zip(results) {
            match result {
                Ok(ReconcileOutcome {
                    requeue_after: Some(after),
                    ..
                }) => {
                    schedule.insert(name.clone(), now + after);
                }
                Ok(_) => {
                    schedule.remove(name);
                }
                Err(e) => {
                    error!(ocloud = %name, error = %e, "Reconcile cycle errored");
                    schedule.insert(name.clone(), now + error_requeue);
                }
            }
        }
        Ok(due.len())
    }

    /// Tick until `cancel` fires.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.reconciler.config().tick());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Reconcile loop started");

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("Reconcile loop stopped");
                    return;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.run_once().await {
                        error!(error = %e, "Failed to list O-Clouds");
                    }
                }
            }
        }
    }
}
