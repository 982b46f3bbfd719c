//! Retry with exponential backoff for transient transport failures.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::{
    DEFAULT_RETRY_BACKOFF_FACTOR, DEFAULT_RETRY_INTERVAL_MS, DEFAULT_RETRY_MAX_ATTEMPTS,
};

/// Backoff schedule for [`retry`].
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Multiplier applied to the delay after each retry.
    pub backoff_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RETRY_MAX_ATTEMPTS,
            initial_delay: Duration::from_millis(DEFAULT_RETRY_INTERVAL_MS),
            backoff_factor: DEFAULT_RETRY_BACKOFF_FACTOR,
        }
    }
}

impl RetryConfig {
    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let nanos = self.initial_delay.as_nanos() as f64
            * self.backoff_factor.max(1.0).powi(exponent);
        Duration::from_nanos(nanos.round().min(u64::MAX as f64) as u64)
    }
}

/// Errors that can tell whether another attempt may succeed.
pub trait RetryableError {
    fn is_retryable(&self) -> bool;
}

impl RetryableError for reqwest::Error {
    /// Timeouts and connection failures are transient: refused, DNS, and a
    /// connection closed or reset before or while the response was read.
    fn is_retryable(&self) -> bool {
        self.is_timeout()
            || self.is_connect()
            || self.is_body()
            || (self.is_request() && self.status().is_none())
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// `config.max_attempts` attempts have been made. The last error is returned.
pub async fn retry<T, E, F, Fut>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    E: RetryableError + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                let delay = config.delay_after(attempt);
                debug!(
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                if e.is_retryable() {
                    warn!(attempts = attempt, error = %e, "Giving up after retries");
                }
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    #[derive(Debug)]
    struct TestError {
        retryable: bool,
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "test error (retryable: {})", self.retryable)
        }
    }

    impl RetryableError for TestError {
        fn is_retryable(&self) -> bool {
            self.retryable
        }
    }

    fn schedule(config: &RetryConfig) -> Vec<Duration> {
        (1..config.max_attempts.max(1))
            .map(|attempt| config.delay_after(attempt))
            .collect()
    }

    fn quick(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            backoff_factor: 2.0,
        }
    }

    #[test]
    fn default_schedule_is_300_then_600_ms() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(
            schedule(&config),
            vec![Duration::from_millis(300), Duration::from_millis(600)]
        );
    }

    #[test]
    fn single_attempt_has_no_delays() {
        assert!(schedule(&quick(1)).is_empty());
        assert!(schedule(&quick(0)).is_empty());
    }

    #[test]
    fn factor_below_one_never_shrinks_delay() {
        let config = RetryConfig {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            backoff_factor: 0.5,
        };
        assert_eq!(
            schedule(&config),
            vec![Duration::from_millis(100), Duration::from_millis(100)]
        );
    }

    #[tokio::test]
    async fn succeeds_first_time_without_retry() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, TestError> = retry(&quick(3), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(7)
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_transient_errors_until_success() {
        let calls = AtomicU32::new(0);
        let result = retry(&quick(3), || async {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 {
                Err(TestError { retryable: true })
            } else {
                Ok(n)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn stops_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), TestError> = retry(&quick(3), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(TestError { retryable: true })
        })
        .await;
        assert!(result.unwrap_err().retryable);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_permanent_errors() {
        let calls = AtomicU32::new(0);
        let result: Result<(), TestError> = retry(&quick(3), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(TestError { retryable: false })
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn waits_between_attempts() {
        let config = RetryConfig {
            max_attempts: 3,
            initial_delay: Duration::from_millis(20),
            backoff_factor: 2.0,
        };
        let start = Instant::now();
        let _: Result<(), TestError> =
            retry(&config, || async { Err(TestError { retryable: true }) }).await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(60), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(560), "{elapsed:?}");
    }
}
