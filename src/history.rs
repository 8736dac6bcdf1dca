//! Rolling window of health check outcomes.
//!
//! The window is a FIFO ring: once `capacity` outcomes are held, each new
//! record evicts the oldest. Uptime and current status are recomputed from
//! the raw window on every call rather than tracked incrementally.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::ConfigError;
use crate::probes::HealthCheckOutcome;

/// Uptime reported for a window with no outcomes yet.
pub const EMPTY_WINDOW_UPTIME: f64 = 100.0;

/// Coarse state shown next to the service name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    /// No check has completed yet.
    Pending,
    Online,
    Offline,
}

/// The latest outcome as the status page renders it, or a pending
/// placeholder before the first check.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentStatus {
    pub state: ServiceState,
    pub is_healthy: bool,
    pub response_time_ms: u64,
    pub last_checked: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl CurrentStatus {
    pub fn pending() -> Self {
        Self {
            state: ServiceState::Pending,
            is_healthy: false,
            response_time_ms: 0,
            last_checked: None,
            error: None,
        }
    }
}

impl From<&HealthCheckOutcome> for CurrentStatus {
    fn from(outcome: &HealthCheckOutcome) -> Self {
        Self {
            state: if outcome.is_healthy() {
                ServiceState::Online
            } else {
                ServiceState::Offline
            },
            is_healthy: outcome.is_healthy(),
            response_time_ms: outcome.response_time_ms(),
            last_checked: Some(outcome.timestamp()),
            error: outcome.error().map(str::to_string),
        }
    }
}

/// Capacity-bounded, append-only history of outcomes, oldest first.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    records: VecDeque<HealthCheckOutcome>,
    capacity: usize,
}

impl HistoryStore {
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::InvalidCapacity);
        }
        Ok(Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
        })
    }

    /// Append `outcome`, evicting the oldest record when full.
    pub fn record(&mut self, outcome: HealthCheckOutcome) {
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(outcome);
    }

    pub fn latest(&self) -> Option<&HealthCheckOutcome> {
        self.records.back()
    }

    /// Percentage of healthy outcomes in the window, `100.0` when empty.
    pub fn uptime(&self) -> f64 {
        if self.records.is_empty() {
            return EMPTY_WINDOW_UPTIME;
        }
        let healthy = self.records.iter().filter(|o| o.is_healthy()).count();
        100.0 * healthy as f64 / self.records.len() as f64
    }

    pub fn current_status(&self) -> CurrentStatus {
        self.latest()
            .map(CurrentStatus::from)
            .unwrap_or_else(CurrentStatus::pending)
    }

    /// Copy of the window, oldest first.
    pub fn snapshot(&self) -> Vec<HealthCheckOutcome> {
        self.records.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn outcome_at(secs: i64, healthy: bool) -> HealthCheckOutcome {
        let ts = DateTime::<Utc>::UNIX_EPOCH + Duration::seconds(secs);
        if healthy {
            HealthCheckOutcome::healthy(ts, 50)
        } else {
            HealthCheckOutcome::unhealthy(ts, 500, "request timed out after 500ms")
        }
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert_eq!(HistoryStore::new(0).unwrap_err(), ConfigError::InvalidCapacity);
    }

    #[test]
    fn test_empty_window() {
        let store = HistoryStore::new(10).unwrap();
        assert!(store.is_empty());
        assert!(store.latest().is_none());
        assert_eq!(store.uptime(), 100.0);
        assert_eq!(store.current_status(), CurrentStatus::pending());
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn test_uptime_matches_healthy_ratio() {
        let mut store = HistoryStore::new(100).unwrap();
        // healthy, healthy, unhealthy, healthy -> 75%
        for (i, healthy) in [true, true, false, true].into_iter().enumerate() {
            store.record(outcome_at(i as i64, healthy));
        }
        assert_eq!(store.uptime(), 75.0);

        let mut all_down = HistoryStore::new(5).unwrap();
        for i in 0..5 {
            all_down.record(outcome_at(i, false));
        }
        assert_eq!(all_down.uptime(), 0.0);
    }

    #[test]
    fn test_alternating_outcomes_give_fifty_percent() {
        let mut store = HistoryStore::new(1_440).unwrap();
        for i in 0..10 {
            store.record(outcome_at(i, i % 2 == 0));
        }
        assert_eq!(store.uptime(), 50.0);
    }

    #[test]
    fn test_eviction_keeps_most_recent_in_order() {
        let capacity = 4;
        let mut store = HistoryStore::new(capacity).unwrap();
        for i in 0..(capacity as i64 + 3) {
            store.record(outcome_at(i, true));
        }

        assert_eq!(store.len(), capacity);
        let secs: Vec<i64> = store
            .snapshot()
            .iter()
            .map(|o| o.timestamp().timestamp())
            .collect();
        assert_eq!(secs, vec![3, 4, 5, 6]);
    }

    #[test]
    fn test_eviction_recomputes_uptime() {
        let mut store = HistoryStore::new(2).unwrap();
        store.record(outcome_at(0, false));
        store.record(outcome_at(1, true));
        assert_eq!(store.uptime(), 50.0);
        // The failure falls out of the window.
        store.record(outcome_at(2, true));
        assert_eq!(store.uptime(), 100.0);
    }

    #[test]
    fn test_latest_is_most_recent_record() {
        let mut store = HistoryStore::new(3).unwrap();
        store.record(outcome_at(0, true));
        store.record(outcome_at(1, false));
        let latest = store.latest().unwrap();
        assert_eq!(latest.timestamp().timestamp(), 1);
        assert!(!latest.is_healthy());

        let status = store.current_status();
        assert_eq!(status.state, ServiceState::Offline);
        assert_eq!(status.response_time_ms, 500);
        assert_eq!(status.error.as_deref(), Some("request timed out after 500ms"));
        assert_eq!(status.last_checked, Some(latest.timestamp()));
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let mut store = HistoryStore::new(3).unwrap();
        store.record(outcome_at(0, true));
        let snapshot = store.snapshot();
        store.record(outcome_at(1, true));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(store.len(), 2);
    }
}
