use super::{capped_millis, HealthCheckOutcome, HealthPolicy, HealthProbe};
use crate::config::ConfigError;
use chrono::Utc;
use reqwest::Client;
use std::time::{Duration, Instant};

/// HTTP probe: GET the target and classify the response with a [`HealthPolicy`].
pub struct HttpProbe {
    client: Client,
    policy: HealthPolicy,
}

impl HttpProbe {
    pub fn new(policy: HealthPolicy) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .user_agent(concat!("statuswatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConfigError::HttpClient {
                reason: e.to_string(),
            })?;
        Ok(Self { client, policy })
    }

    pub fn policy(&self) -> &HealthPolicy {
        &self.policy
    }

    async fn fetch(&self, url: &str) -> Result<(), String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| describe_error(&e))?;

        self.policy.check_status(response.status().as_u16())?;

        if self.policy.needs_body() {
            let body = response
                .bytes()
                .await
                .map_err(|e| format!("failed to read health payload: {e}"))?;
            self.policy.check_body(&body)?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl HealthProbe for HttpProbe {
    async fn check(&self, target: &str, timeout: Duration) -> HealthCheckOutcome {
        let url = normalize_target(target);

        // The probe owns its timeout; nothing upstream watches it.
        let start = Instant::now();
        let attempt = tokio::time::timeout(timeout, self.fetch(&url)).await;
        let elapsed_ms = capped_millis(start.elapsed(), timeout);
        let timestamp = Utc::now();

        match attempt {
            Ok(Ok(())) => {
                tracing::debug!(%url, elapsed_ms, "health probe succeeded");
                HealthCheckOutcome::healthy(timestamp, elapsed_ms)
            }
            Ok(Err(reason)) => {
                tracing::debug!(%url, elapsed_ms, %reason, "health probe failed");
                HealthCheckOutcome::unhealthy(timestamp, elapsed_ms, reason)
            }
            Err(_) => {
                let timeout_ms = capped_millis(timeout, timeout);
                tracing::debug!(%url, timeout_ms, "health probe timed out");
                HealthCheckOutcome::unhealthy(
                    timestamp,
                    timeout_ms,
                    format!("request timed out after {timeout_ms}ms"),
                )
            }
        }
    }
}

fn normalize_target(target: &str) -> String {
    let target = target.trim();
    if target.starts_with("http://") || target.starts_with("https://") {
        target.to_string()
    } else {
        format!("http://{}", target)
    }
}

fn describe_error(e: &reqwest::Error) -> String {
    if e.is_connect() {
        format!("connection failed: {e}")
    } else if e.is_timeout() {
        format!("request timed out: {e}")
    } else if e.is_builder() {
        format!("invalid request: {e}")
    } else {
        format!("request failed: {e}")
    }
}
