//! # Duration Validation
//!
//! Handles parsing Kubernetes duration strings such as the CertificateConfig
//! `waitTimeout`.

use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

/// Matches one `<number><unit>` segment. `ms` must come before `m`.
static SEGMENT_REGEX: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?P<number>\d+)(?P<unit>ms|s|m|h|d)").ok());

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DurationError {
    #[error("Duration string cannot be empty")]
    Empty,
    #[error("Invalid duration format '{0}'. Expected format: <number><unit> (e.g., '30s', '1m', '1h30m')")]
    InvalidFormat(String),
    #[error("Invalid duration number '{number}' in '{input}'")]
    InvalidNumber { number: String, input: String },
    #[error("Duration must be greater than 0, got '{0}'")]
    Zero(String),
}

/// Parse Kubernetes duration string into `std::time::Duration`
///
/// Supports single units ("30s", "5m", "1h", "1d") and the compound form
/// Kubernetes emits for `metav1.Duration` ("1m0s", "1h30m", "500ms").
pub fn parse_kubernetes_duration(duration_str: &str) -> Result<Duration, DurationError> {
    let trimmed = duration_str.trim();
    if trimmed.is_empty() {
        return Err(DurationError::Empty);
    }

    let lower = trimmed.to_lowercase();
    let regex = SEGMENT_REGEX
        .as_ref()
        .ok_or_else(|| DurationError::InvalidFormat(trimmed.to_string()))?;

    let mut total = Duration::ZERO;
    let mut consumed = 0;
    for captures in regex.captures_iter(&lower) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        // Segments must be contiguous, anything in between is garbage
        if whole.start() != consumed {
            return Err(DurationError::InvalidFormat(trimmed.to_string()));
        }
        consumed = whole.end();

        let number_str = &captures["number"];
        let number: u64 = number_str
            .parse()
            .map_err(|_| DurationError::InvalidNumber {
                number: number_str.to_string(),
                input: trimmed.to_string(),
            })?;

        let segment = match &captures["unit"] {
            "ms" => Duration::from_millis(number),
            "s" => Duration::from_secs(number),
            "m" => Duration::from_secs(number.saturating_mul(60)),
            "h" => Duration::from_secs(number.saturating_mul(3600)),
            "d" => Duration::from_secs(number.saturating_mul(86400)),
            _ => return Err(DurationError::InvalidFormat(trimmed.to_string())),
        };
        total = total.saturating_add(segment);
    }

    if consumed == 0 || consumed != lower.len() {
        return Err(DurationError::InvalidFormat(trimmed.to_string()));
    }
    if total.is_zero() {
        return Err(DurationError::Zero(trimmed.to_string()));
    }

    Ok(total)
}
