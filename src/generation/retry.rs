//! Retry policy shared by every call to the generative endpoint

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::RetryConfig;
use crate::error::{AppError, Result};

type BackoffFn = dyn Fn(u32) -> Duration + Send + Sync;

/// `(max_attempts, backoff)` pair driving a retry loop.
///
/// The backoff function receives the one-based number of the attempt that
/// just failed and returns how long to wait before the next one.
#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Arc<BackoffFn>,
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

impl RetryPolicy {
    pub fn new<F>(max_attempts: u32, backoff: F) -> Self
    where
        F: Fn(u32) -> Duration + Send + Sync + 'static,
    {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: Arc::new(backoff),
        }
    }

    /// `base * 2^i` between attempt `i` and `i + 1`
    pub fn exponential(max_attempts: u32, base: Duration) -> Self {
        Self::new(max_attempts, move |attempt| {
            base.saturating_mul(1u32.checked_shl(attempt).unwrap_or(u32::MAX))
        })
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::exponential(config.max_attempts, config.base_delay())
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay_after(&self, attempt: u32) -> Duration {
        (self.backoff)(attempt)
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, runs out
    /// of attempts or `cancel` fires. `op` receives the zero-based attempt index.
    pub async fn run<T, F, Fut>(
        &self,
        operation: &str,
        cancel: &CancellationToken,
        mut op: F,
    ) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut last_error = String::new();

        for attempt in 0..self.max_attempts {
            if cancel.is_cancelled() {
                return Err(AppError::Cancelled);
            }

            debug!(operation, attempt = attempt + 1, "Requesting");

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(AppError::Cancelled),
                outcome = op(attempt) => outcome,
            };

            match outcome {
                Ok(value) => {
                    if attempt > 0 {
                        info!(operation, attempts = attempt + 1, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if !err.is_retryable() => return Err(err),
                Err(err) => {
                    warn!(operation, attempt = attempt + 1, error = %err, "Attempt failed");
                    last_error = err.to_string();

                    if attempt + 1 < self.max_attempts {
                        let delay = self.delay_after(attempt + 1);
                        debug!(operation, delay_ms = delay.as_millis() as u64, "Retrying");
                        tokio::select! {
                            biased;
                            _ = cancel.cancelled() => return Err(AppError::Cancelled),
                            _ = tokio::time::sleep(delay) => {}
                        }
                    }
                }
            }
        }

        warn!(operation, attempts = self.max_attempts, "Retries exhausted");
        Err(AppError::RetriesExhausted {
            attempts: self.max_attempts,
            last_error,
        })
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::exponential(5, Duration::from_secs(1))
    }
}
