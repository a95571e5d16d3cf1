//! Request, record and configuration types for control plane operations.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use ocloud_core::{parse_resource_value, AllocationId};
use serde::{Deserialize, Serialize};

use crate::error::{ControlError, Dimension, Result};

/// Request to allocate capacity from a pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRequest {
    /// Caller-chosen request identifier, echoed on the allocation.
    pub id: String,
    /// Pool to allocate from.
    pub pool_name: String,
    /// CPU units.
    #[serde(default)]
    pub cpu: i64,
    /// Memory bytes.
    #[serde(default)]
    pub memory: i64,
    /// Storage bytes.
    #[serde(default)]
    pub storage: i64,
    /// Network bandwidth; recorded, never enforced.
    #[serde(default)]
    pub network_bw: i64,
    /// Scheduling priority.
    #[serde(default)]
    pub priority: i32,
    /// Placement constraints.
    #[serde(default)]
    pub constraints: BTreeMap<String, String>,
}

impl ResourceRequest {
    /// Create a request with numeric quantities.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        pool_name: impl Into<String>,
        cpu: i64,
        memory: i64,
        storage: i64,
    ) -> Self {
        Self {
            id: id.into(),
            pool_name: pool_name.into(),
            cpu,
            memory,
            storage,
            ..Self::default()
        }
    }

    /// Create a request from quantity strings such as `"4"` and `"8Gi"`.
    ///
    /// Blank strings request nothing in that dimension.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::InvalidQuantity` if a non-blank value does not parse.
    pub fn from_quantities(
        id: impl Into<String>,
        pool_name: impl Into<String>,
        cpu: &str,
        memory: &str,
        storage: &str,
    ) -> Result<Self> {
        let parse = |dimension: Dimension, value: &str| -> Result<i64> {
            if value.trim().is_empty() {
                return Ok(0);
            }
            parse_resource_value(value)
                .map_err(|source| ControlError::InvalidQuantity { dimension, source })
        };

        Ok(Self::new(
            id,
            pool_name,
            parse(Dimension::Cpu, cpu)?,
            parse(Dimension::Memory, memory)?,
            parse(Dimension::Storage, storage)?,
        ))
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.pool_name.is_empty() {
            return Err(ControlError::InvalidRequest("pool name is required".into()));
        }
        if self.cpu < 0 || self.memory < 0 || self.storage < 0 || self.network_bw < 0 {
            return Err(ControlError::InvalidRequest(
                "requested quantities must not be negative".into(),
            ));
        }
        Ok(())
    }
}

/// A granted allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceAllocation {
    /// Unique allocation identifier.
    pub id: AllocationId,
    /// The originating request's identifier.
    pub request_id: String,
    /// Pool the capacity was taken from.
    pub pool_name: String,
    /// CPU units.
    pub cpu: i64,
    /// Memory bytes.
    pub memory: i64,
    /// Storage bytes.
    pub storage: i64,
    /// Network bandwidth, as requested.
    pub network_bw: i64,
    /// When the allocation was granted.
    pub allocated_at: DateTime<Utc>,
    /// Always `"active"` while the allocation exists.
    pub status: String,
}

/// Utilization percentages of one pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolUtilization {
    /// Pool name.
    pub pool_name: String,
    /// Allocated CPU as a percentage of total.
    pub cpu_utilization: f64,
    /// Allocated memory as a percentage of total.
    pub memory_utilization: f64,
    /// Allocated storage as a percentage of total.
    pub storage_utilization: f64,
    /// Live allocations in the pool.
    pub allocation_count: usize,
    /// When the figures were computed.
    pub timestamp: DateTime<Utc>,
}

/// Snapshot of one managed pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolStatus {
    /// Pool name.
    pub name: String,
    /// Pool type.
    #[serde(rename = "type")]
    pub pool_type: String,
    /// Pool location.
    pub location: String,
    /// Pool status, `"active"` once ensured.
    pub status: String,
    /// Total CPU units.
    pub total_cpu: i64,
    /// Unallocated CPU units.
    pub available_cpu: i64,
    /// Total memory bytes.
    pub total_memory: i64,
    /// Unallocated memory bytes.
    pub available_memory: i64,
    /// Total storage bytes.
    pub total_storage: i64,
    /// Unallocated storage bytes.
    pub available_storage: i64,
    /// Declared network capacity string.
    pub network: String,
    /// Live allocations in the pool.
    pub allocation_count: usize,
    /// When the pool was last ensured or changed.
    pub last_updated: DateTime<Utc>,
}

/// A pool running hotter than the configured threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtilizationWarning {
    /// Pool name.
    pub pool_name: String,
    /// CPU utilization percentage.
    pub cpu_utilization: f64,
    /// Memory utilization percentage.
    pub memory_utilization: f64,
    /// Threshold that was exceeded.
    pub threshold: f64,
}

/// Point-in-time telemetry snapshot for one O-Cloud.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryMetrics {
    /// When the snapshot was taken.
    pub timestamp: DateTime<Utc>,
    /// The O-Cloud it describes.
    pub ocloud_name: String,
    /// Number of declared pools.
    pub resource_pools: usize,
    /// Total CPU units.
    pub total_cpu: i64,
    /// Unallocated CPU units.
    pub available_cpu: i64,
    /// Total memory bytes.
    pub total_memory: i64,
    /// Unallocated memory bytes.
    pub available_memory: i64,
    /// Total storage bytes.
    pub total_storage: i64,
    /// Unallocated storage bytes.
    pub available_storage: i64,
    /// Live allocations across all pools.
    pub active_allocations: usize,
    /// Errors seen during the cycle.
    pub error_count: u32,
    /// Warnings seen during the cycle.
    pub warning_count: u32,
}

/// Configuration for the control plane.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlConfig {
    /// Requeue delay after a successful cycle (seconds).
    #[serde(default = "ControlConfig::default_success_requeue_secs")]
    pub success_requeue_secs: u64,
    /// Requeue delay after a failed cycle (seconds).
    #[serde(default = "ControlConfig::default_error_requeue_secs")]
    pub error_requeue_secs: u64,
    /// How often the loop looks for due O-Clouds (seconds).
    #[serde(default = "ControlConfig::default_tick_secs")]
    pub tick_secs: u64,
    /// Timeout for each SMO HTTP call (seconds).
    #[serde(default = "ControlConfig::default_smo_timeout_secs")]
    pub smo_timeout_secs: u64,
    /// Bearer token sent to the SMO when its `authType` is set.
    #[serde(default)]
    pub smo_auth_token: Option<String>,
    /// Telemetry ring capacity.
    #[serde(default = "ControlConfig::default_telemetry_capacity")]
    pub telemetry_capacity: usize,
    /// Utilization percentage above which a pool is flagged.
    #[serde(default = "ControlConfig::default_warning_threshold")]
    pub utilization_warning_threshold: f64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            success_requeue_secs: Self::default_success_requeue_secs(),
            error_requeue_secs: Self::default_error_requeue_secs(),
            tick_secs: Self::default_tick_secs(),
            smo_timeout_secs: Self::default_smo_timeout_secs(),
            smo_auth_token: None,
            telemetry_capacity: Self::default_telemetry_capacity(),
            utilization_warning_threshold: Self::default_warning_threshold(),
        }
    }
}

impl ControlConfig {
    const fn default_success_requeue_secs() -> u64 {
        300
    }

    const fn default_error_requeue_secs() -> u64 {
        60
    }

    const fn default_tick_secs() -> u64 {
        5
    }

    const fn default_smo_timeout_secs() -> u64 {
        30
    }

    const fn default_telemetry_capacity() -> usize {
        1000
    }

    const fn default_warning_threshold() -> f64 {
        80.0
    }

    /// Load overrides from the environment.
    ///
    /// Reads `SMO_AUTH_TOKEN`, `RECONCILE_INTERVAL_SECS`, `ERROR_REQUEUE_SECS`
    /// and `SMO_TIMEOUT_SECS`; anything unset or unparsable keeps its default.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        let secs = |key: &str| std::env::var(key).ok().and_then(|v| v.parse::<u64>().ok());

        if let Some(v) = secs("RECONCILE_INTERVAL_SECS") {
            config.success_requeue_secs = v;
        }
        if let Some(v) = secs("ERROR_REQUEUE_SECS") {
            config.error_requeue_secs = v;
        }
        if let Some(v) = secs("SMO_TIMEOUT_SECS") {
            config.smo_timeout_secs = v;
        }
        config.smo_auth_token = std::env::var("SMO_AUTH_TOKEN").ok().filter(|t| !t.is_empty());
        config
    }

    /// Requeue delay after success.
    #[must_use]
    pub const fn success_requeue(&self) -> Duration {
        Duration::from_secs(self.success_requeue_secs)
    }

    /// Requeue delay after failure.
    #[must_use]
    pub const fn error_requeue(&self) -> Duration {
        Duration::from_secs(self.error_requeue_secs)
    }

    /// Loop tick.
    #[must_use]
    pub const fn tick(&self) -> Duration {
        Duration::from_secs(self.tick_secs)
    }

    /// SMO request timeout.
    #[must_use]
    pub const fn smo_timeout(&self) -> Duration {
        Duration::from_secs(self.smo_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_from_quantities() {
        let req = ResourceRequest::from_quantities("req-1", "edge-1", "4", "8Gi", "").unwrap();
        assert_eq!(req.cpu, 4);
        assert_eq!(req.memory, 8 * 1024 * 1024 * 1024);
        assert_eq!(req.storage, 0);
        assert_eq!(req.pool_name, "edge-1");
    }

    #[test]
    fn request_from_bad_quantity() {
        let err = ResourceRequest::from_quantities("req-1", "edge-1", "lots", "1Gi", "").unwrap_err();
        assert!(matches!(
            err,
            ControlError::InvalidQuantity {
                dimension: Dimension::Cpu,
                ..
            }
        ));
    }

    #[test]
    fn negative_request_is_invalid() {
        let req = ResourceRequest::new("r", "p", -1, 0, 0);
        assert!(matches!(req.validate(), Err(ControlError::InvalidRequest(_))));
        assert!(ResourceRequest::new("r", "", 1, 0, 0).validate().is_err());
        assert!(ResourceRequest::new("r", "p", 1, 0, 0).validate().is_ok());
    }

    #[test]
    fn control_config_defaults() {
        let config = ControlConfig::default();
        assert_eq!(config.success_requeue(), Duration::from_secs(300));
        assert_eq!(config.error_requeue(), Duration::from_secs(60));
        assert_eq!(config.smo_timeout(), Duration::from_secs(30));
        assert_eq!(config.telemetry_capacity, 1000);
        assert!((config.utilization_warning_threshold - 80.0).abs() < f64::EPSILON);
    }

    #[test]
    fn control_config_deserializes_with_defaults() {
        let config: ControlConfig = serde_json::from_str(r#"{"tick_secs": 1}"#).unwrap();
        assert_eq!(config.tick(), Duration::from_secs(1));
        assert_eq!(config.error_requeue_secs, 60);
    }
}
