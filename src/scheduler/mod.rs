//! Periodic health monitoring: a recurring timer that drives the probe and
//! feeds each outcome into the history window.

mod engine;
mod flight;

use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use self::flight::SingleFlight;
use crate::config::ConfigError;
use crate::history::HistoryStore;
use crate::probes::{duration_millis, HealthCheckOutcome, HealthProbe};

/// History window shared between the scheduler (sole writer) and readers.
pub type SharedHistory = Arc<RwLock<HistoryStore>>;

/// Drives [`HealthProbe`] on a fixed interval and records every outcome.
///
/// Cloning is cheap and yields a handle to the same scheduler. `start` spawns
/// onto the ambient tokio runtime, so it must be called from within one.
#[derive(Clone)]
pub struct MonitorScheduler {
    inner: Arc<Inner>,
}

struct Inner {
    probe: Arc<dyn HealthProbe>,
    target: String,
    timeout: Duration,
    history: SharedHistory,
    flight: SingleFlight,
    timer: Mutex<Option<Timer>>,
}

/// The active recurring tick.
struct Timer {
    interval: Duration,
    token: CancellationToken,
    next_tick: Arc<Mutex<DateTime<Utc>>>,
}

impl MonitorScheduler {
    pub fn new(
        probe: Arc<dyn HealthProbe>,
        target: impl Into<String>,
        timeout: Duration,
        history: SharedHistory,
    ) -> Result<Self, ConfigError> {
        if timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout);
        }
        Ok(Self {
            inner: Arc::new(Inner {
                probe,
                target: target.into(),
                timeout,
                history,
                flight: SingleFlight::default(),
                timer: Mutex::new(None),
            }),
        })
    }

    /// Begin ticking every `interval`. The first tick fires one full interval
    /// from now. Calling this while already running does nothing.
    pub fn start(&self, interval: Duration) -> Result<(), ConfigError> {
        if interval.is_zero() {
            return Err(ConfigError::InvalidInterval);
        }

        let mut timer = self.lock_timer();
        if let Some(active) = timer.as_ref() {
            debug!(
                interval_ms = duration_millis(active.interval),
                "monitor already running, start ignored"
            );
            return Ok(());
        }

        let token = CancellationToken::new();
        let next_tick = Arc::new(Mutex::new(after_interval(interval)));
        tokio::spawn(engine::run_monitor_loop(
            self.clone(),
            interval,
            token.clone(),
            Arc::clone(&next_tick),
        ));

        info!(
            target_url = %self.inner.target,
            interval_ms = duration_millis(interval),
            "monitoring started"
        );
        *timer = Some(Timer {
            interval,
            token,
            next_tick,
        });
        Ok(())
    }

    /// Cancel the recurring tick. A probe already in flight still completes
    /// and records its outcome. Calling this while stopped does nothing.
    pub fn stop(&self) {
        match self.lock_timer().take() {
            Some(active) => {
                active.token.cancel();
                info!(target_url = %self.inner.target, "monitoring stopped");
            }
            None => debug!("monitor not running, stop ignored"),
        }
    }

    /// Run one probe-and-record cycle and return its outcome. If a cycle is
    /// already in flight this joins it instead of probing again.
    pub async fn run_once(&self) -> HealthCheckOutcome {
        let inner = Arc::clone(&self.inner);
        let (cycle, started) = self.inner.flight.join_or_start(move |release| {
            let handle = tokio::spawn(async move {
                let outcome = inner.probe_isolated().await;
                inner
                    .history
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .record(outcome.clone());
                release.release();
                outcome
            });
            async move {
                handle.await.unwrap_or_else(|e| {
                    HealthCheckOutcome::unhealthy(
                        Utc::now(),
                        0,
                        format!("health check cycle failed: {e}"),
                    )
                })
            }
            .boxed()
        });

        if !started {
            debug!("health check already in flight, joining it");
        }
        cycle.await
    }

    /// Whether a probe is in flight right now.
    pub fn is_checking(&self) -> bool {
        self.inner.flight.in_flight()
    }

    pub fn is_running(&self) -> bool {
        self.lock_timer().is_some()
    }

    /// Interval of the active timer, if running.
    pub fn interval(&self) -> Option<Duration> {
        self.lock_timer().as_ref().map(|t| t.interval)
    }

    /// Wall-clock time of the next scheduled tick, if running.
    pub fn next_tick(&self) -> Option<DateTime<Utc>> {
        self.lock_timer().as_ref().map(|t| {
            *t.next_tick
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
        })
    }

    pub fn target(&self) -> &str {
        &self.inner.target
    }

    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }

    fn lock_timer(&self) -> std::sync::MutexGuard<'_, Option<Timer>> {
        self.inner
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Inner {
    /// Run the probe in its own task so a panic inside it becomes an
    /// unhealthy outcome instead of taking the cycle down with it.
    async fn probe_isolated(&self) -> HealthCheckOutcome {
        let probe = Arc::clone(&self.probe);
        let target = self.target.clone();
        let timeout = self.timeout;

        match tokio::spawn(async move { probe.check(&target, timeout).await }).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(target_url = %self.target, error = %e, "probe task failed");
                HealthCheckOutcome::unhealthy(Utc::now(), 0, format!("probe task failed: {e}"))
            }
        }
    }
}

/// Wall-clock instant one `interval` from now, saturating on overflow.
pub(crate) fn after_interval(interval: Duration) -> DateTime<Utc> {
    let now = Utc::now();
    chrono::Duration::from_std(interval)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
