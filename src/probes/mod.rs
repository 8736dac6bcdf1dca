//! Health probes: one outbound check against the monitored API per call.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod http;

pub use self::http::HttpProbe;

/// Result of a single probe. Healthy outcomes never carry an error and
/// unhealthy ones always do; the constructors are the only way to build one.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckOutcome {
    timestamp: DateTime<Utc>,
    is_healthy: bool,
    response_time_ms: u64,
    error: Option<String>,
}

impl HealthCheckOutcome {
    pub fn healthy(timestamp: DateTime<Utc>, response_time_ms: u64) -> Self {
        Self {
            timestamp,
            is_healthy: true,
            response_time_ms,
            error: None,
        }
    }

    pub fn unhealthy(
        timestamp: DateTime<Utc>,
        response_time_ms: u64,
        error: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            is_healthy: false,
            response_time_ms,
            error: Some(error.into()),
        }
    }

    /// Instant the check completed.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn is_healthy(&self) -> bool {
        self.is_healthy
    }

    pub fn response_time_ms(&self) -> u64 {
        self.response_time_ms
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Rule deciding whether a response from the monitored API counts as healthy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HealthPolicy {
    /// Any 2xx status.
    #[default]
    SuccessStatus,
    /// Status must be one of `codes`.
    StatusCodes { codes: Vec<u16> },
    /// 2xx status and the JSON body value at `pointer` equals `expected`,
    /// e.g. `{"status": "ok"}` with pointer `/status`.
    JsonField {
        pointer: String,
        expected: serde_json::Value,
    },
}

impl HealthPolicy {
    /// Whether the body has to be read to classify the response.
    pub fn needs_body(&self) -> bool {
        matches!(self, HealthPolicy::JsonField { .. })
    }

    /// Classify a status code alone. `Err` carries the failure description.
    pub fn check_status(&self, status: u16) -> Result<(), String> {
        let accepted = match self {
            HealthPolicy::StatusCodes { codes } => codes.contains(&status),
            HealthPolicy::SuccessStatus | HealthPolicy::JsonField { .. } => {
                (200..300).contains(&status)
            }
        };
        if accepted {
            Ok(())
        } else {
            Err(format!("unhealthy response: HTTP {status}"))
        }
    }

    /// Classify a response body. Only meaningful for `JsonField`.
    pub fn check_body(&self, body: &[u8]) -> Result<(), String> {
        let HealthPolicy::JsonField { pointer, expected } = self else {
            return Ok(());
        };

        let json: serde_json::Value = serde_json::from_slice(body)
            .map_err(|e| format!("health payload is not valid JSON: {e}"))?;
        match json.pointer(pointer) {
            Some(actual) if actual == expected => Ok(()),
            Some(actual) => Err(format!(
                "unexpected health payload: {pointer} = {actual}, expected {expected}"
            )),
            None => Err(format!("health payload has no field at {pointer}")),
        }
    }
}

/// A single health check against a target. Implementations capture every
/// failure mode into the returned outcome instead of erroring.
#[async_trait::async_trait]
pub trait HealthProbe: Send + Sync {
    async fn check(&self, target: &str, timeout: Duration) -> HealthCheckOutcome;
}

/// Whole milliseconds in `d`, saturating at `u64::MAX`.
pub fn duration_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Elapsed time in whole milliseconds, never more than the timeout.
pub(crate) fn capped_millis(elapsed: Duration, timeout: Duration) -> u64 {
    duration_millis(elapsed.min(timeout))
}
