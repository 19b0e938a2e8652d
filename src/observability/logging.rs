//! # Logging
//!
//! Sets up the `tracing` subscriber. `RUST_LOG` takes precedence over the
//! configured level; the output format is plain text or JSON.

use crate::config::LogFormat;
use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Default filter when neither `RUST_LOG` nor a level is configured
pub const DEFAULT_LOG_FILTER: &str = "certificate_operator=info";

/// Build the env filter from `RUST_LOG`, falling back to `certificate_operator=<level>`
#[must_use]
pub fn env_filter(level: Option<&str>) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| match level {
        Some(level) => EnvFilter::new(format!("certificate_operator={level}")),
        None => EnvFilter::new(DEFAULT_LOG_FILTER),
    })
}

/// Install the global tracing subscriber
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed
pub fn init_logging(level: Option<&str>, format: LogFormat) -> Result<()> {
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter(level));

    match format {
        LogFormat::Json => builder
            .json()
            .with_current_span(false)
            .try_init()
            .map_err(|e| anyhow!("Failed to initialize tracing subscriber: {e}")),
        LogFormat::Text => builder
            .try_init()
            .map_err(|e| anyhow!("Failed to initialize tracing subscriber: {e}")),
    }
}
