//! Retry/backoff plumbing for the planner's outbound HTTP calls.
//!
//! Adapted from `aperture::resilience`: exponential backoff with jitter,
//! `Retry-After` awareness, and a retryable-status table. The verifier's
//! poll loop (`planner::verifier`) intentionally does NOT use this module —
//! it polls at a fixed interval for a state change rather than retrying a
//! failed call, per SPEC_FULL.md §4.10.

use reqwest::header::HeaderMap;
use std::time::{Duration, SystemTime};
use tokio::time::sleep;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: usize,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 100,
            max_delay_ms: 5_000,
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 5_000,
            request_timeout_ms: 10_000,
        }
    }
}

/// Parses a `Retry-After` header, supporting both the delay-seconds and
/// HTTP-date forms.
#[must_use]
pub fn parse_retry_after_header(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get("retry-after")?.to_str().ok()?;
    parse_retry_after_value(value)
}

#[must_use]
pub fn parse_retry_after_value(value: &str) -> Option<Duration> {
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }
    let date = httpdate::parse_http_date(value).ok()?;
    date.duration_since(SystemTime::now()).ok()
}

#[must_use]
pub const fn is_retryable_status(status: u16) -> bool {
    match status {
        408 | 429 => true,
        500..=599 => !matches!(status, 501 | 505),
        _ => false,
    }
}

#[must_use]
pub fn is_retryable_error(error: &reqwest::Error) -> bool {
    if error.is_connect() || error.is_timeout() {
        return true;
    }
    error
        .status()
        .is_none_or(|status| is_retryable_status(status.as_u16()))
}

#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn calculate_retry_delay(config: &RetryConfig, attempt: usize) -> Duration {
    let base = config.initial_delay_ms as f64;
    let capped_attempt = i32::try_from(attempt.min(30)).unwrap_or(30);
    let delay_ms =
        (base * config.backoff_multiplier.powi(capped_attempt)).min(config.max_delay_ms as f64);
    let final_delay_ms = if config.jitter {
        delay_ms * fastrand::f64().mul_add(0.25, 1.0)
    } else {
        delay_ms
    } as u64;
    Duration::from_millis(final_delay_ms)
}

#[must_use]
pub fn calculate_retry_delay_with_header(
    config: &RetryConfig,
    attempt: usize,
    retry_after: Option<Duration>,
) -> Duration {
    let calculated = calculate_retry_delay(config, attempt);
    retry_after.map_or(calculated, |server_delay| {
        calculated
            .max(server_delay)
            .min(Duration::from_millis(config.max_delay_ms))
    })
}

/// Runs `operation` with exponential backoff, retrying only on connect/
/// timeout errors or retryable HTTP statuses. Non-retryable errors and
/// attempts-exhausted both surface the last error unchanged.
///
/// # Errors
/// Returns the last `reqwest::Error` observed once attempts are exhausted or
/// a non-retryable error occurs.
pub async fn execute_with_retry<F, Fut, T>(
    config: &RetryConfig,
    mut operation: F,
) -> Result<T, reqwest::Error>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, reqwest::Error>>,
{
    for attempt in 0..config.max_attempts {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                let is_last = attempt + 1 >= config.max_attempts;
                if is_last || !is_retryable_error(&error) {
                    return Err(error);
                }
                sleep(calculate_retry_delay(config, attempt)).await;
            }
        }
    }
    unreachable!("loop always returns on the final attempt")
}

#[must_use]
pub fn create_resilient_client(timeout: &TimeoutConfig) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_millis(timeout.connect_timeout_ms))
        .timeout(Duration::from_millis(timeout.request_timeout_ms))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let config = RetryConfig {
            max_attempts: 5,
            initial_delay_ms: 100,
            max_delay_ms: 1000,
            backoff_multiplier: 2.0,
            jitter: false,
        };
        assert_eq!(calculate_retry_delay(&config, 0).as_millis(), 100);
        assert_eq!(calculate_retry_delay(&config, 1).as_millis(), 200);
        assert_eq!(calculate_retry_delay(&config, 2).as_millis(), 400);
        assert_eq!(calculate_retry_delay(&config, 10).as_millis(), 1000);
    }

    #[test]
    fn retryable_status_table() {
        assert!(is_retryable_status(408));
        assert!(is_retryable_status(429));
        assert!(is_retryable_status(500));
        assert!(!is_retryable_status(501));
        assert!(!is_retryable_status(505));
        assert!(!is_retryable_status(404));
    }

    #[test]
    fn retry_after_parses_seconds() {
        assert_eq!(
            parse_retry_after_value("120"),
            Some(Duration::from_secs(120))
        );
    }

    #[test]
    fn retry_after_rejects_garbage() {
        assert_eq!(parse_retry_after_value("not-a-date"), None);
    }
}
