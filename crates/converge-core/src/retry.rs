// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Bounded whole-call retry for transient service conditions.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::classify::{ErrorClass, RemoteError, classify};
use crate::config::ConvergeConfig;
use crate::error::{ConvergeError, Result};

/// Retry policy for errors classified as [`ErrorClass::Transient`].
///
/// Only the transient class is retried. Not-found and fatal errors are
/// returned after the first attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransientRetry {
    /// Number of repeats after the first call.
    pub retries: u32,
    /// Fixed sleep between attempts.
    pub delay: Duration,
}

impl Default for TransientRetry {
    fn default() -> Self {
        Self::from_config(&ConvergeConfig::default())
    }
}

impl TransientRetry {
    /// Create a retry policy repeating a transient failure up to `retries` times.
    pub fn new(retries: u32, delay: Duration) -> Self {
        Self { retries, delay }
    }

    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Largest number of calls issued.
    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// Retry policy from configuration.
    pub fn from_config(config: &ConvergeConfig) -> Self {
        Self::new(config.transient_retry_count, config.transient_retry_delay)
    }

    /// Run `call`, repeating it while it fails with a transient error.
    ///
    /// `cancel` is checked before every attempt and interrupts the sleep
    /// between attempts. An attempt already in flight is not interrupted.
    pub async fn run<T, E, F, Fut>(
        &self,
        operation: &str,
        cancel: &CancellationToken,
        mut call: F,
    ) -> std::result::Result<T, RetryHalt<E>>
    where
        E: RemoteError,
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        let mut attempt: u32 = 1;
        loop {
            if cancel.is_cancelled() {
                debug!(operation, attempt, "Cancelled before attempt");
                return Err(RetryHalt::Cancelled {
                    attempts: attempt - 1,
                });
            }

            match call().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation, attempt, "Call succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if classify(&err) == ErrorClass::Transient && attempt < self.max_attempts() => {
                    warn!(
                        operation,
                        attempt,
                        max_attempts = self.max_attempts(),
                        delay_ms = self.delay.as_millis() as u64,
                        error = %err.message(),
                        "Transient error, retrying"
                    );
                    tokio::select! {
                        biased;

                        _ = cancel.cancelled() => {
                            debug!(operation, attempt, "Cancelled while waiting to retry");
                            return Err(RetryHalt::Cancelled { attempts: attempt });
                        }

                        _ = tokio::time::sleep(self.delay) => {}
                    }
                    attempt += 1;
                }
                Err(error) => {
                    return Err(RetryHalt::Failed {
                        error,
                        attempts: attempt,
                    });
                }
            }
        }
    }

    /// Run `call` without cancellation, mapping the final error onto [`ConvergeError`].
    pub async fn call<T, E, F, Fut>(&self, operation: &str, call: F) -> Result<T>
    where
        E: RemoteError,
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        self.call_cancellable(operation, &CancellationToken::new(), call)
            .await
    }

    /// Like [`TransientRetry::call`], giving up with
    /// `TimedOut { cancelled: true }` once `cancel` fires.
    pub async fn call_cancellable<T, E, F, Fut>(
        &self,
        operation: &str,
        cancel: &CancellationToken,
        call: F,
    ) -> Result<T>
    where
        E: RemoteError,
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        self.run(operation, cancel, call)
            .await
            .map_err(|halt| match halt {
                RetryHalt::Failed { error, attempts } => {
                    ConvergeError::from_remote(&error, attempts)
                }
                RetryHalt::Cancelled { .. } => ConvergeError::TimedOut { cancelled: true },
            })
    }
}

/// Why [`TransientRetry::run`] gave up.
#[derive(Debug)]
pub enum RetryHalt<E> {
    /// The last attempt failed with an error that is not retried, or the
    /// retries ran out.
    Failed { error: E, attempts: u32 },
    /// The token was cancelled. `attempts` calls had been made.
    Cancelled { attempts: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, thiserror::Error)]
    #[error("{0}")]
    struct Unavailable(&'static str);

    impl RemoteError for Unavailable {
        fn is_not_found(&self) -> bool {
            self.0 == "gone"
        }

        fn is_transient(&self) -> bool {
            self.0 == "busy"
        }
    }

    #[test]
    fn test_max_attempts_includes_first_call() {
        assert_eq!(TransientRetry::new(2, Duration::ZERO).max_attempts(), 3);
        assert_eq!(TransientRetry::none().max_attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_until_success() {
        let calls = &AtomicU32::new(0);
        let retry = TransientRetry::new(2, Duration::from_secs(60));

        let result = retry
            .call("create", || async move {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(Unavailable("busy"))
                } else {
                    Ok("conn-1")
                }
            })
            .await;

        assert_eq!(result.unwrap(), "conn-1");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_reports_attempts() {
        let calls = &AtomicU32::new(0);
        let retry = TransientRetry::new(2, Duration::from_secs(60));

        let err = retry
            .call("update", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(Unavailable("busy"))
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(matches!(
            err,
            ConvergeError::TransientExhausted { attempts: 3, .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_interrupts_retry_delay() {
        let calls = &AtomicU32::new(0);
        let retry = TransientRetry::new(2, Duration::from_secs(600));
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            canceller.cancel();
        });

        let started = tokio::time::Instant::now();
        let halt = retry
            .run("stop", &token, || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(Unavailable("busy"))
            })
            .await
            .unwrap_err();

        assert!(matches!(halt, RetryHalt::Cancelled { attempts: 1 }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(started.elapsed() < Duration::from_secs(600));
    }

    #[tokio::test]
    async fn test_cancelled_token_makes_no_call() {
        let calls = &AtomicU32::new(0);
        let token = CancellationToken::new();
        token.cancel();

        let err = TransientRetry::new(2, Duration::from_secs(60))
            .call_cancellable("update", &token, || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Unavailable>(())
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ConvergeError::TimedOut { cancelled: true }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fatal_and_not_found_are_not_retried() {
        let calls = &AtomicU32::new(0);
        let retry = TransientRetry::new(5, Duration::from_secs(60));

        let err = retry
            .call("delete", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(Unavailable("gone"))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ConvergeError::NotFound(_)));

        let err = retry
            .call("delete", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(Unavailable("boom"))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ConvergeError::Remote(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
