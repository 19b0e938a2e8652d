//! # Controller Configuration
//!
//! Operator-level settings loaded from environment variables.

use crate::constants::{
    BACKOFF_MAX_MINUTES, BACKOFF_MIN_MINUTES, DEFAULT_MAX_CONCURRENT_RECONCILIATIONS,
    DEFAULT_METRICS_PORT, DEFAULT_RESYNC_INTERVAL_SECS, NOT_FOUND_REQUEUE_SECS,
};
use std::str::FromStr;
use std::time::Duration;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "text" | "plain" => Ok(LogFormat::Text),
            other => Err(format!("unknown log format '{other}', expected json or text")),
        }
    }
}

/// Operator-level configuration
///
/// All settings have defaults in `constants.rs` and can be overridden via
/// environment variables or command line flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// How often a valid Certificate is re-evaluated for renewal (seconds)
    pub resync_interval_secs: u64,
    /// Maximum concurrent reconciliations per controller
    pub max_concurrent_reconciliations: u16,
    /// Port of the metrics and probe server
    pub metrics_port: u16,
    /// Log level applied to the operator's own targets when `RUST_LOG` is unset
    pub log_level: Option<String>,
    pub log_format: LogFormat,
    /// Delay before re-reading the validity of a guid the Cert API does not know yet (seconds)
    pub not_found_requeue_secs: u64,
    /// Fibonacci backoff bounds for failed reconciliations (minutes)
    pub backoff_min_minutes: u64,
    pub backoff_max_minutes: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            resync_interval_secs: DEFAULT_RESYNC_INTERVAL_SECS,
            max_concurrent_reconciliations: DEFAULT_MAX_CONCURRENT_RECONCILIATIONS,
            metrics_port: DEFAULT_METRICS_PORT,
            log_level: None,
            log_format: LogFormat::Json,
            not_found_requeue_secs: NOT_FOUND_REQUEUE_SECS,
            backoff_min_minutes: BACKOFF_MIN_MINUTES,
            backoff_max_minutes: BACKOFF_MAX_MINUTES,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            resync_interval_secs: env_var_or_default(
                "RESYNC_INTERVAL_SECS",
                DEFAULT_RESYNC_INTERVAL_SECS,
            ),
            max_concurrent_reconciliations: env_var_or_default(
                "MAX_CONCURRENT_RECONCILIATIONS",
                DEFAULT_MAX_CONCURRENT_RECONCILIATIONS,
            ),
            metrics_port: env_var_or_default("METRICS_PORT", DEFAULT_METRICS_PORT),
            log_level: std::env::var("LOG_LEVEL").ok().filter(|v| !v.is_empty()),
            log_format: env_var_or_default("LOG_FORMAT", LogFormat::Json),
            not_found_requeue_secs: env_var_or_default(
                "NOT_FOUND_REQUEUE_SECS",
                NOT_FOUND_REQUEUE_SECS,
            ),
            backoff_min_minutes: env_var_or_default("BACKOFF_MIN_MINUTES", BACKOFF_MIN_MINUTES),
            backoff_max_minutes: env_var_or_default("BACKOFF_MAX_MINUTES", BACKOFF_MAX_MINUTES),
        }
    }

    #[must_use]
    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_interval_secs)
    }

    #[must_use]
    pub fn not_found_requeue(&self) -> Duration {
        Duration::from_secs(self.not_found_requeue_secs)
    }
}

/// Read environment variable or return default value
fn env_var_or_default<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
