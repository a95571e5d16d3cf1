//! Bounded telemetry history.

use std::collections::VecDeque;

use parking_lot::RwLock;
use tracing::debug;

use crate::types::TelemetryMetrics;

/// Keeps the most recent telemetry snapshots, evicting the oldest on overflow.
#[derive(Debug)]
pub struct TelemetryManager {
    metrics: RwLock<VecDeque<TelemetryMetrics>>,
    capacity: usize,
}

impl Default for TelemetryManager {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl TelemetryManager {
    /// Create a manager that keeps at most `capacity` snapshots.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            metrics: RwLock::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
        }
    }

    /// Append a snapshot.
    pub fn record_metrics(&self, metrics: TelemetryMetrics) {
        debug!(ocloud = %metrics.ocloud_name, "Recording telemetry metrics");

        let mut ring = self.metrics.write();
        ring.push_back(metrics);
        while ring.len() > self.capacity {
            ring.pop_front();
        }
    }

    /// The most recent `limit` snapshots, oldest first.
    #[must_use]
    pub fn get_metrics(&self, limit: usize) -> Vec<TelemetryMetrics> {
        let ring = self.metrics.read();
        let skip = ring.len().saturating_sub(limit);
        ring.iter().skip(skip).cloned().collect()
    }

    /// Number of retained snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.metrics.read().len()
    }

    /// Whether nothing has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.metrics.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn snapshot(n: i64) -> TelemetryMetrics {
        TelemetryMetrics {
            timestamp: Utc::now(),
            ocloud_name: "edge-cloud".to_string(),
            resource_pools: 1,
            total_cpu: n,
            available_cpu: n,
            total_memory: 0,
            available_memory: 0,
            total_storage: 0,
            available_storage: 0,
            active_allocations: 0,
            error_count: 0,
            warning_count: 0,
        }
    }

    #[test]
    fn returns_most_recent_in_order() {
        let telemetry = TelemetryManager::default();
        for n in 0..5 {
            telemetry.record_metrics(snapshot(n));
        }

        let recent: Vec<i64> = telemetry.get_metrics(3).iter().map(|m| m.total_cpu).collect();
        assert_eq!(recent, vec![2, 3, 4]);
        assert_eq!(telemetry.get_metrics(100).len(), 5);
        assert!(telemetry.get_metrics(0).is_empty());
    }

    #[test]
    fn evicts_oldest_past_capacity() {
        let telemetry = TelemetryManager::default();
        for n in 0..1005 {
            telemetry.record_metrics(snapshot(n));
        }

        assert_eq!(telemetry.len(), 1000);
        let all = telemetry.get_metrics(usize::MAX);
        assert_eq!(all.first().unwrap().total_cpu, 5);
        assert_eq!(all.last().unwrap().total_cpu, 1004);
    }
}
