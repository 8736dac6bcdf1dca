//! The status service: the handle the UI layer and HTTP API hold.
//!
//! One service owns one history window and one scheduler. There is no global
//! instance; whoever starts the process constructs the service and passes the
//! handle to its consumers.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::{ConfigError, MonitorConfig};
use crate::history::{CurrentStatus, HistoryStore};
use crate::probes::{duration_millis, HealthCheckOutcome, HealthProbe, HttpProbe};
use crate::scheduler::{MonitorScheduler, SharedHistory};

/// Uptime at or above this renders as good.
pub const GOOD_UPTIME_PCT: f64 = 99.0;
/// Uptime at or above this (and below good) renders as degraded.
pub const DEGRADED_UPTIME_PCT: f64 = 95.0;

/// Bucket the status page colors the uptime bar by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UptimeGrade {
    Good,
    Degraded,
    Poor,
}

impl UptimeGrade {
    pub fn from_uptime(uptime: f64) -> Self {
        if uptime >= GOOD_UPTIME_PCT {
            UptimeGrade::Good
        } else if uptime >= DEGRADED_UPTIME_PCT {
            UptimeGrade::Degraded
        } else {
            UptimeGrade::Poor
        }
    }
}

/// Read-only snapshot for the status page, derived fresh on every query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusPageData {
    pub current_status: CurrentStatus,
    pub uptime: f64,
    pub uptime_grade: UptimeGrade,
    pub samples: usize,
    pub monitoring: bool,
    pub check_in_progress: bool,
    pub check_interval_ms: Option<u64>,
    pub next_check: Option<DateTime<Utc>>,
}

/// Facade over the history window and scheduler.
pub struct StatusService {
    history: SharedHistory,
    scheduler: MonitorScheduler,
}

impl StatusService {
    /// Build a service probing over HTTP with the configured policy.
    pub fn new(config: &MonitorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let probe = HttpProbe::new(config.policy.clone())?;
        Self::with_probe(config, Arc::new(probe))
    }

    /// Build a service around any probe implementation.
    pub fn with_probe(
        config: &MonitorConfig,
        probe: Arc<dyn HealthProbe>,
    ) -> Result<Self, ConfigError> {
        let history = Arc::new(RwLock::new(HistoryStore::new(config.history_capacity)?));
        let scheduler = MonitorScheduler::new(
            probe,
            config.target_url.clone(),
            config.timeout(),
            Arc::clone(&history),
        )?;
        Ok(Self { history, scheduler })
    }

    /// Start the recurring check. Already running is a no-op; a zero
    /// interval is rejected before anything is scheduled.
    pub fn start_monitoring(&self, interval_ms: u64) -> Result<(), ConfigError> {
        self.scheduler.start(Duration::from_millis(interval_ms))
    }

    pub fn stop_monitoring(&self) {
        self.scheduler.stop();
    }

    /// Manual refresh: one check, returned once its outcome is recorded.
    pub async fn check_api_health(&self) -> HealthCheckOutcome {
        self.scheduler.run_once().await
    }

    /// Current status and uptime, computed from the window at call time.
    /// Never touches the network.
    pub fn get_status_data(&self) -> StatusPageData {
        let (current_status, uptime, samples) = {
            let store = self.read_history();
            (store.current_status(), store.uptime(), store.len())
        };

        StatusPageData {
            current_status,
            uptime,
            uptime_grade: UptimeGrade::from_uptime(uptime),
            samples,
            monitoring: self.scheduler.is_running(),
            check_in_progress: self.scheduler.is_checking(),
            check_interval_ms: self
                .scheduler
                .interval()
                .map(duration_millis),
            next_check: self.scheduler.next_tick(),
        }
    }

    /// The whole window, oldest first.
    pub fn history(&self) -> Vec<HealthCheckOutcome> {
        self.read_history().snapshot()
    }

    pub fn target(&self) -> &str {
        self.scheduler.target()
    }

    fn read_history(&self) -> std::sync::RwLockReadGuard<'_, HistoryStore> {
        self.history.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for StatusService {
    fn drop(&mut self) {
        self.scheduler.stop();
    }
}
