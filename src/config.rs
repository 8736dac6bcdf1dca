//! TOML configuration for the status monitor.
//!
//! Layered like the rest of the daemon: compiled-in defaults, overridden by a
//! config file named on the command line or through `STATUSWATCH_CONFIG`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::probes::HealthPolicy;

/// Environment variable naming the config file when `--config` is absent.
pub const CONFIG_ENV: &str = "STATUSWATCH_CONFIG";

/// Rejected configuration. Raised synchronously at construction or
/// `start_monitoring` time, never from a running monitor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("check interval must be greater than zero")]
    InvalidInterval,

    #[error("probe timeout must be greater than zero")]
    InvalidTimeout,

    #[error("history capacity must be greater than zero")]
    InvalidCapacity,

    #[error("invalid probe target {target:?}: {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("failed to build HTTP client: {reason}")]
    HttpClient { reason: String },
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration for the statuswatch process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        config
            .monitor
            .validate()
            .with_context(|| format!("invalid monitor section in {}", path.display()))?;
        info!(path = %path.display(), "loaded statuswatch configuration");
        Ok(config)
    }

    /// Resolve configuration from, in order:
    /// 1. An explicit path (from `--config`).
    /// 2. The path in `STATUSWATCH_CONFIG`.
    /// 3. Compiled-in defaults.
    ///
    /// A named file that cannot be read, parsed or validated is an error
    /// whichever way it was named.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let from_env = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        Self::resolve_from(explicit, from_env.as_deref())
    }

    fn resolve_from(explicit: Option<&Path>, from_env: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        if let Some(path) = from_env {
            return Self::load(path)
                .with_context(|| format!("{CONFIG_ENV} names an unusable config file"));
        }

        debug!("no config file given, using compiled-in defaults");
        Ok(Self::default())
    }

    /// Render the effective configuration back to TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to serialize configuration")
    }
}

// ---------------------------------------------------------------------------
// Monitor
// ---------------------------------------------------------------------------

/// What to probe, how often, and how much history to keep.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Health endpoint of the monitored API.
    pub target_url: String,
    /// Per-probe timeout in milliseconds.
    pub timeout_ms: u64,
    /// Polling interval in milliseconds.
    pub interval_ms: u64,
    /// Maximum number of outcomes kept in the uptime window.
    pub history_capacity: usize,
    /// Start the recurring timer as soon as the daemon comes up.
    pub autostart: bool,
    /// How a response is classified healthy.
    pub policy: HealthPolicy,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            target_url: "http://127.0.0.1:8888/api/health".to_string(),
            timeout_ms: 5_000,
            interval_ms: 60_000,
            // One day at one-minute intervals.
            history_capacity: 1_440,
            autostart: true,
            policy: HealthPolicy::default(),
        }
    }
}

impl MonitorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Fail fast on values the monitor cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        if self.interval_ms == 0 {
            return Err(ConfigError::InvalidInterval);
        }
        if self.history_capacity == 0 {
            return Err(ConfigError::InvalidCapacity);
        }
        validate_target(&self.target_url)
    }
}

fn validate_target(target: &str) -> Result<(), ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidTarget {
        target: target.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = target.trim();
    if trimmed.is_empty() {
        return Err(invalid("target cannot be empty"));
    }
    if trimmed.chars().any(char::is_whitespace) {
        return Err(invalid("target cannot contain whitespace"));
    }
    if let Some((scheme, _)) = trimmed.split_once("://") {
        if scheme != "http" && scheme != "https" {
            return Err(invalid("only http and https targets are supported"));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// HTTP listener for the status API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address and port the status API binds to.
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8090".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Output format for the tracing subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration. `RUST_LOG` takes precedence over `level`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum tracing level (`trace`, `debug`, `info`, `warn`, `error`).
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_sane() {
        let cfg = Config::default();

        assert_eq!(cfg.monitor.target_url, "http://127.0.0.1:8888/api/health");
        assert_eq!(cfg.monitor.timeout_ms, 5_000);
        assert_eq!(cfg.monitor.interval_ms, 60_000);
        assert_eq!(cfg.monitor.history_capacity, 1_440);
        assert!(cfg.monitor.autostart);
        assert_eq!(cfg.monitor.policy, HealthPolicy::SuccessStatus);
        assert!(cfg.monitor.validate().is_ok());

        assert_eq!(cfg.server.bind, "127.0.0.1:8090");
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_zero_values_rejected() {
        let mut cfg = MonitorConfig::default();
        cfg.interval_ms = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::InvalidInterval));

        let mut cfg = MonitorConfig::default();
        cfg.timeout_ms = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::InvalidTimeout));

        let mut cfg = MonitorConfig::default();
        cfg.history_capacity = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::InvalidCapacity));
    }

    #[test]
    fn test_bad_targets_rejected() {
        for target in ["", "   ", "ftp://example.com/health", "http://exa mple.com"] {
            let cfg = MonitorConfig {
                target_url: target.to_string(),
                ..MonitorConfig::default()
            };
            assert!(
                matches!(cfg.validate(), Err(ConfigError::InvalidTarget { .. })),
                "target {target:?} should be rejected"
            );
        }

        let bare = MonitorConfig {
            target_url: "api.example.com/health".to_string(),
            ..MonitorConfig::default()
        };
        assert!(bare.validate().is_ok());
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[monitor]
target_url = "https://so.example.com/api/health"
interval_ms = 30000

[monitor.policy]
kind = "json_field"
pointer = "/status"
expected = "ok"

[logging]
format = "json"
"#
        )
        .unwrap();

        let cfg = Config::load(file.path()).unwrap();
        assert_eq!(cfg.monitor.target_url, "https://so.example.com/api/health");
        assert_eq!(cfg.monitor.interval_ms, 30_000);
        // Untouched keys keep their defaults.
        assert_eq!(cfg.monitor.timeout_ms, 5_000);
        assert_eq!(cfg.server.bind, "127.0.0.1:8090");
        assert_eq!(cfg.logging.format, LogFormat::Json);
        assert_eq!(
            cfg.monitor.policy,
            HealthPolicy::JsonField {
                pointer: "/status".to_string(),
                expected: serde_json::json!("ok"),
            }
        );
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[monitor]\ninterval_ms = 0").unwrap();
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_env_named_invalid_file_is_fatal() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[monitor]\ninterval_ms = 0").unwrap();

        let err = Config::resolve_from(None, Some(file.path())).unwrap_err();
        assert!(format!("{err:#}").contains("check interval must be greater than zero"));

        let missing = Path::new("/nonexistent/statuswatch.toml");
        assert!(Config::resolve_from(None, Some(missing)).is_err());
    }

    #[test]
    fn test_env_named_file_is_used() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[monitor]\ninterval_ms = 15000").unwrap();

        let cfg = Config::resolve_from(None, Some(file.path())).unwrap();
        assert_eq!(cfg.monitor.interval_ms, 15_000);
    }

    #[test]
    fn test_explicit_path_wins_over_env() {
        let mut explicit = tempfile::NamedTempFile::new().unwrap();
        writeln!(explicit, "[monitor]\ninterval_ms = 20000").unwrap();
        let mut env = tempfile::NamedTempFile::new().unwrap();
        writeln!(env, "[monitor]\ninterval_ms = 0").unwrap();

        let cfg = Config::resolve_from(Some(explicit.path()), Some(env.path())).unwrap();
        assert_eq!(cfg.monitor.interval_ms, 20_000);

        let defaults = Config::resolve_from(None, None).unwrap();
        assert_eq!(defaults.monitor.interval_ms, 60_000);
    }

    #[test]
    fn test_round_trip_through_toml() {
        let rendered = Config::default().to_toml().unwrap();
        assert!(rendered.contains("[monitor]"));
        let parsed: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.monitor.history_capacity, 1_440);
    }
}
