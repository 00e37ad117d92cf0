//! Retry with exponential backoff for platform requests.
//!
//! Rate limits (429) back off harder than server errors (5xx) and transport
//! failures; anything else fails immediately. A `Retry-After` hint from the
//! platform overrides the computed delay.

use anyhow::{Result, anyhow};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;

use crate::domain::config::PlatformConfig;
use crate::strings::logs;

const RATE_LIMIT_CAP_MS: u64 = 60_000;
const ERROR_CAP_MS: u64 = 30_000;

/// A failed request attempt.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("transport error: {message}")]
    Transport { message: String, retryable: bool },

    #[error("HTTP {status}: {body}")]
    Status {
        status: u16,
        body: String,
        retry_after_ms: Option<u64>,
    },
}

impl RequestError {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::Status { status: 429, .. })
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { retryable, .. } => *retryable,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
        }
    }

    fn retry_after_ms(&self) -> Option<u64> {
        match self {
            Self::Status { retry_after_ms, .. } => *retry_after_ms,
            Self::Transport { .. } => None,
        }
    }

    fn label(&self) -> String {
        match self {
            Self::Transport { .. } => "transport error".to_string(),
            Self::Status { status, .. } => status.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    max_retries: u32,
    base_delay_ms: u64,
    exponential_backoff: bool,
}

impl RetryPolicy {
    pub fn new(base_delay_ms: u64, max_retries: u32, exponential_backoff: bool) -> Self {
        Self {
            max_retries,
            base_delay_ms: base_delay_ms.max(1),
            exponential_backoff,
        }
    }

    pub fn from_config(config: &PlatformConfig) -> Self {
        Self::new(
            config.retry_base_delay_ms,
            u32::try_from(config.max_retries).unwrap_or(u32::MAX),
            true,
        )
    }

    pub fn base_delay_ms(&self) -> u64 {
        self.base_delay_ms
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Delay before retry number `attempt` (1-based).
    fn calculate_delay(&self, attempt: u32, rate_limited: bool) -> u64 {
        if !self.exponential_backoff {
            return if rate_limited {
                self.base_delay_ms * 2
            } else {
                self.base_delay_ms
            };
        }

        let multiplier: u64 = if rate_limited { 4 } else { 2 };
        let cap = if rate_limited { RATE_LIMIT_CAP_MS } else { ERROR_CAP_MS };
        multiplier
            .checked_pow(attempt.saturating_sub(1))
            .and_then(|factor| self.base_delay_ms.checked_mul(factor))
            .unwrap_or(cap)
            .min(cap)
    }

    /// Runs `operation` until it succeeds, fails with a non-retryable error, or the
    /// retries are used up.
    pub async fn execute<F, Fut, T>(&self, label: &str, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, RequestError>>,
    {
        let mut attempt = 0;
        loop {
            let error = match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if !error.is_retryable() || attempt >= self.max_retries {
                return Err(anyhow!(error).context(format!("{label} failed after {} attempts", attempt + 1)));
            }

            attempt += 1;
            let delay = error
                .retry_after_ms()
                .unwrap_or_else(|| self.calculate_delay(attempt, error.is_rate_limit()));
            tracing::warn!("{}", logs::request_retry(&error.label(), attempt, delay));
            sleep(Duration::from_millis(delay)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn status(code: u16) -> RequestError {
        RequestError::Status {
            status: code,
            body: String::new(),
            retry_after_ms: None,
        }
    }

    #[test]
    fn test_delay_calculation() {
        let policy = RetryPolicy::new(10, 3, false);
        assert_eq!(policy.calculate_delay(1, false), 10);
        assert_eq!(policy.calculate_delay(3, false), 10);
        assert_eq!(policy.calculate_delay(2, true), 20);

        let policy = RetryPolicy::new(10, 3, true);
        assert_eq!(policy.calculate_delay(1, false), 10);
        assert_eq!(policy.calculate_delay(2, false), 20);
        assert_eq!(policy.calculate_delay(3, false), 40);
    }

    #[test]
    fn test_rate_limit_delay() {
        let policy = RetryPolicy::new(10, 3, true);
        assert_eq!(policy.calculate_delay(1, true), 10);
        assert_eq!(policy.calculate_delay(2, true), 40);
        assert_eq!(policy.calculate_delay(3, true), 160);
    }

    #[test]
    fn test_exponential_cap() {
        let policy = RetryPolicy::new(1_000, 10, true);
        assert_eq!(policy.calculate_delay(10, false), ERROR_CAP_MS);
        assert_eq!(policy.calculate_delay(10, true), RATE_LIMIT_CAP_MS);
        assert_eq!(policy.calculate_delay(200, true), RATE_LIMIT_CAP_MS);
    }

    #[test]
    fn test_minimum_delay() {
        assert_eq!(RetryPolicy::new(0, 3, true).base_delay_ms(), 1);
    }

    #[test]
    fn test_retryable_errors() {
        assert!(status(429).is_retryable());
        assert!(status(429).is_rate_limit());
        assert!(status(500).is_retryable());
        assert!(status(503).is_retryable());
        assert!(!status(400).is_retryable());
        assert!(!status(404).is_retryable());
        assert!(
            RequestError::Transport {
                message: "connection reset".into(),
                retryable: true
            }
            .is_retryable()
        );
    }

    #[tokio::test]
    async fn test_execute_retries_until_success() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(1, 3, true);
        let result = policy
            .execute("GET /commands", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move { if n < 2 { Err(status(503)) } else { Ok(n) } }
            })
            .await
            .unwrap();
        assert_eq!(result, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_execute_stops_on_client_error() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(1, 3, true);
        let result: Result<()> = policy
            .execute("POST /commands", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(status(400)) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_execute_gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(1, 2, true);
        let result: Result<()> = policy
            .execute("PUT /commands", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(status(502)) }
            })
            .await;
        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("after 3 attempts"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
