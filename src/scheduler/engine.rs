use super::{after_interval, MonitorScheduler};
use crate::probes::duration_millis;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Stand-in deadline for intervals too long to add to the clock.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Recurring monitor loop. Ticks every `period`, starting one period from
/// now, until `token` is cancelled. Cancellation is only observed between
/// ticks, so a cycle that has begun always runs to completion.
pub(super) async fn run_monitor_loop(
    scheduler: MonitorScheduler,
    period: Duration,
    token: CancellationToken,
    next_tick: Arc<Mutex<DateTime<Utc>>>,
) {
    info!(interval_ms = duration_millis(period), "monitor loop started");

    let first = Instant::now()
        .checked_add(period)
        .unwrap_or_else(|| Instant::now() + FAR_FUTURE);
    let mut ticker = tokio::time::interval_at(first, period);
    // A slow probe pushes the schedule back rather than causing a burst.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        *next_tick.lock().unwrap_or_else(PoisonError::into_inner) = after_interval(period);

        let outcome = scheduler.run_once().await;
        if outcome.is_healthy() {
            info!(
                target_url = %scheduler.target(),
                response_time_ms = outcome.response_time_ms(),
                "health check passed"
            );
        } else {
            warn!(
                target_url = %scheduler.target(),
                response_time_ms = outcome.response_time_ms(),
                error = outcome.error().unwrap_or_default(),
                "health check failed"
            );
        }
    }

    info!("monitor loop stopped");
}
