//! # Transactional Retry Executor
//!
//! Wraps a unit of work that opens, uses and commits its own storage
//! transaction, and transparently re-runs the whole unit when the storage
//! layer reports a transient conflict (serialization failure, deadlock,
//! connectivity hiccup). A retry always re-executes from scratch with fresh
//! reads, which turns every check-then-act operation into a
//! compare-and-swap expressed as an optimistic transaction retry loop.

use futures::future::BoxFuture;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::RetryConfig;
use crate::error::{CoreError, Result};

#[derive(Debug, Clone)]
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Execute a unit of work, retrying transient failures.
    ///
    /// The closure must produce a fresh future per call: each attempt opens
    /// its own transaction, so nothing from an aborted attempt leaks into
    /// the next one. Non-transient errors propagate immediately; transient
    /// errors are absorbed until the attempt budget is exhausted, after
    /// which a [`CoreError::Transient`] tagged with `operation` is surfaced.
    pub async fn execute<'a, T, F>(&self, operation: &'static str, mut unit_of_work: F) -> Result<T>
    where
        F: FnMut() -> BoxFuture<'a, Result<T>>,
    {
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            match unit_of_work().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation, attempt, "operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if err.is_transient() => {
                    if attempt >= self.config.max_attempts {
                        warn!(
                            operation,
                            attempt,
                            error = %err,
                            "retry budget exhausted"
                        );
                        return Err(CoreError::Transient {
                            operation: operation.to_string(),
                            message: format!("giving up after {attempt} attempts: {err}"),
                        });
                    }

                    let delay = self.backoff_delay(attempt);
                    warn!(
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient conflict, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Exponential backoff capped at the configured maximum.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let delay_ms = self
            .config
            .backoff_base_ms
            .saturating_mul(1u64 << exponent)
            .min(self.config.backoff_max_ms);
        Duration::from_millis(delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_executor(max_attempts: u32) -> RetryExecutor {
        RetryExecutor::new(RetryConfig {
            max_attempts,
            backoff_base_ms: 1,
            backoff_max_ms: 4,
        })
    }

    fn transient(message: &str) -> CoreError {
        CoreError::Transient {
            operation: "test".into(),
            message: message.into(),
        }
    }

    #[tokio::test]
    async fn succeeds_first_try_without_retrying() {
        let calls = AtomicU32::new(0);
        let result = fast_executor(3)
            .execute("Test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                Box::pin(async { Ok(42) })
            })
            .await
            .unwrap();

        assert_eq!(result, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_transient_failures_until_success() {
        let calls = AtomicU32::new(0);
        let result = fast_executor(5)
            .execute("Test", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                Box::pin(async move {
                    if n < 2 {
                        Err(transient("serialization failure"))
                    } else {
                        Ok("done")
                    }
                })
            })
            .await
            .unwrap();

        assert_eq!(result, "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhaustion_surfaces_transient_tagged_with_operation() {
        let calls = AtomicU32::new(0);
        let err = fast_executor(3)
            .execute("MarkStepFinished", || {
                calls.fetch_add(1, Ordering::SeqCst);
                Box::pin(async { Err::<(), _>(transient("deadlock detected")) })
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match err {
            CoreError::Transient { operation, message } => {
                assert_eq!(operation, "MarkStepFinished");
                assert!(message.contains("3 attempts"));
            }
            other => panic!("expected Transient, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_transient_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let err = fast_executor(3)
            .execute("SubmitJob", || {
                calls.fetch_add(1, Ordering::SeqCst);
                Box::pin(async { Err::<(), _>(CoreError::validation("unknown processor")) })
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(err, CoreError::Validation { .. }));
    }

    #[test]
    fn backoff_grows_and_is_capped() {
        let executor = RetryExecutor::new(RetryConfig {
            max_attempts: 10,
            backoff_base_ms: 100,
            backoff_max_ms: 1_000,
        });

        assert_eq!(executor.backoff_delay(1), Duration::from_millis(100));
        assert_eq!(executor.backoff_delay(2), Duration::from_millis(200));
        assert_eq!(executor.backoff_delay(3), Duration::from_millis(400));
        assert_eq!(executor.backoff_delay(5), Duration::from_millis(1_000));
        assert_eq!(executor.backoff_delay(10), Duration::from_millis(1_000));
    }
}
