//! Retry with backoff
//!
//! One retry loop shared by every call site that talks to something
//! unreliable: provider lookups (linear delay per word), classifier requests
//! (exponential, capped) and batch upserts (exponential on lock contention).
//!
//! **Algorithm:**
//! 1. Attempt operation
//! 2. If successful, return result
//! 3. If the error is retryable and retries remain: log WARN, back off, retry
//! 4. Otherwise return the error together with the number of retries spent

use std::fmt::Display;
use std::future::Future;
use std::time::{Duration, Instant};

/// Delay growth between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// `base_delay * retry`
    Linear,
    /// `base_delay * 2^(retry - 1)`
    Exponential,
}

/// Retry parameters
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts = max_retries + 1
    pub max_retries: u32,
    pub base_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn linear(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay: base_delay.saturating_mul(max_retries.max(1)),
            backoff: Backoff::Linear,
        }
    }

    pub fn exponential(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
            backoff: Backoff::Exponential,
        }
    }

    /// No retries at all
    pub fn none() -> Self {
        Self::linear(0, Duration::ZERO)
    }

    /// Delay before retry number `retry` (1-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let retry = retry.max(1);
        let delay = match self.backoff {
            Backoff::Linear => self.base_delay.saturating_mul(retry),
            Backoff::Exponential => {
                let factor = 1u32.checked_shl(retry - 1).unwrap_or(u32::MAX);
                self.base_delay.saturating_mul(factor)
            }
        };
        delay.min(self.max_delay)
    }
}

/// Final result of a retried operation
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    pub result: Result<T, E>,
    /// Retries performed (0 when the first attempt decided the outcome)
    pub retries: u32,
}

impl<T, E> RetryOutcome<T, E> {
    pub fn into_result(self) -> Result<T, E> {
        self.result
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or the
/// policy's retry budget is spent.
///
/// The closure receives the 0-based attempt number.
pub async fn retry_with_backoff<F, Fut, T, E, P>(
    operation_name: &str,
    policy: &RetryPolicy,
    is_retryable: P,
    mut operation: F,
) -> RetryOutcome<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let start_time = Instant::now();
    let mut retries = 0u32;

    loop {
        match operation(retries).await {
            Ok(value) => {
                if retries > 0 {
                    tracing::debug!(
                        operation = operation_name,
                        retries,
                        elapsed_ms = start_time.elapsed().as_millis() as u64,
                        "Operation succeeded after retry"
                    );
                }
                return RetryOutcome {
                    result: Ok(value),
                    retries,
                };
            }
            Err(err) => {
                if !is_retryable(&err) {
                    tracing::debug!(
                        operation = operation_name,
                        retries,
                        error = %err,
                        "Non-retryable error, giving up"
                    );
                    return RetryOutcome {
                        result: Err(err),
                        retries,
                    };
                }

                if retries >= policy.max_retries {
                    tracing::warn!(
                        operation = operation_name,
                        attempts = retries + 1,
                        elapsed_ms = start_time.elapsed().as_millis() as u64,
                        error = %err,
                        "Retry budget exhausted"
                    );
                    return RetryOutcome {
                        result: Err(err),
                        retries,
                    };
                }

                retries += 1;
                let backoff = policy.delay_for(retries);

                tracing::warn!(
                    operation = operation_name,
                    attempt = retries,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %err,
                    "Transient failure, will retry after backoff"
                );

                tokio::time::sleep(backoff).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::linear(max_retries, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_retry_succeeds_first_attempt() {
        let outcome = retry_with_backoff("test_op", &fast_policy(3), |_: &String| true, |_| async {
            Ok::<i32, String>(42)
        })
        .await;

        assert_eq!(outcome.retries, 0);
        assert_eq!(outcome.result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_transient_errors() {
        let outcome = retry_with_backoff(
            "test_op",
            &fast_policy(3),
            |_: &String| true,
            |attempt| async move {
                if attempt < 2 {
                    Err("HTTP 500".to_string())
                } else {
                    Ok(7)
                }
            },
        )
        .await;

        assert_eq!(outcome.retries, 2);
        assert_eq!(outcome.result.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_attempts_bounded_by_max_retries_plus_one() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let outcome = retry_with_backoff("test_op", &fast_policy(2), |_: &String| true, move |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), String>("always failing".to_string())
            }
        })
        .await;

        assert!(outcome.result.is_err());
        assert_eq!(outcome.retries, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_error_fails_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let outcome = retry_with_backoff(
            "test_op",
            &fast_policy(5),
            |e: &String| !e.contains("401"),
            move |_| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<(), String>("HTTP 401".to_string())
                }
            },
        )
        .await;

        assert!(outcome.result.is_err());
        assert_eq!(outcome.retries, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_linear_delays() {
        let policy = RetryPolicy::linear(3, Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(300));
    }

    #[test]
    fn test_exponential_delays_are_capped() {
        let policy =
            RetryPolicy::exponential(10, Duration::from_millis(500), Duration::from_secs(4));
        assert_eq!(policy.delay_for(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(4), Duration::from_millis(4000));
        assert_eq!(policy.delay_for(9), Duration::from_millis(4000));
        assert_eq!(policy.delay_for(40), Duration::from_millis(4000));
    }
}
