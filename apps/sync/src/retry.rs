//! Retry policy — the single timeout/retry decorator for all remote calls.
//!
//! ARCHITECTURAL RULE: entity services never hand-roll their own retry or
//! timeout logic. Every remote touch goes through a `RetryPolicy`, so the
//! backoff behavior is uniform and testable in one place.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::errors::AppError;

/// Bounded retry with a per-attempt deadline and linearly increasing backoff
/// (`base_delay × attempt`). Cheap to copy; call sites keep one of the two
/// presets rather than inventing their own numbers.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub timeout: Duration,
}

impl RetryPolicy {
    /// Primary reads and all writes: 30s deadline, 3 attempts.
    pub fn primary() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            timeout: Duration::from_secs(30),
        }
    }

    /// Secondary reads (activity feed, stats): 10s deadline, 2 attempts.
    pub fn secondary() -> Self {
        Self {
            max_attempts: 2,
            base_delay: Duration::from_millis(1000),
            timeout: Duration::from_secs(10),
        }
    }

    /// Runs `op` until it succeeds or attempts are exhausted. Each attempt is
    /// raced against `self.timeout`; between attempts the task sleeps
    /// `base_delay × attempt`.
    pub async fn run<T, F, Fut>(&self, label: &str, op: F) -> Result<T, AppError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let mut last_error: Option<AppError> = None;

        for attempt in 1..=self.max_attempts {
            if attempt > 1 {
                let delay = self.base_delay * (attempt - 1);
                warn!(
                    "{label}: attempt {} failed, retrying after {}ms",
                    attempt - 1,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            match tokio::time::timeout(self.timeout, op()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => {
                    // Schema mismatches select a different write strategy;
                    // retrying the same statement cannot help.
                    if e.is_schema_mismatch() {
                        return Err(e);
                    }
                    last_error = Some(e);
                }
                Err(_) => {
                    last_error = Some(AppError::Timeout {
                        secs: self.timeout.as_secs(),
                    });
                }
            }
        }

        Err(last_error.unwrap_or(AppError::Timeout {
            secs: self.timeout.as_secs(),
        }))
    }

    /// `run`, degraded to a default on failure. This is the catch-log-fallback
    /// policy: read paths never surface a remote error to the caller.
    pub async fn run_or<T, F, Fut>(&self, label: &str, default: T, op: F) -> T
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        match self.run(label, op).await {
            Ok(value) => value,
            Err(e) => {
                warn!("{label}: all attempts failed, using fallback: {e}");
                default
            }
        }
    }
}
