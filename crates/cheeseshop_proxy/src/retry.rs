//! Retrying remote calls with exponential backoff.

use crate::ProxyConfig;
use cheeseshop_error::CheeseshopResult;
use std::future::Future;
use std::time::Duration;
use tokio_retry2::{Retry, RetryError, strategy::ExponentialBackoff, strategy::jitter};
use tracing::warn;

/// Longest pause between two attempts.
const MAX_DELAY: Duration = Duration::from_secs(30);

/// How often, and how patiently, a remote call is repeated.
///
/// Only errors that report [`is_retryable`] are repeated; everything else
/// fails on the first attempt.
///
/// [`is_retryable`]: cheeseshop_error::CheeseshopError::is_retryable
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_getters::Getters)]
pub struct RetryPolicy {
    /// Attempts including the first one
    attempts: usize,
    /// Initial backoff in milliseconds
    backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, 100)
    }
}

impl RetryPolicy {
    /// Policy making at most `attempts` calls.
    pub fn new(attempts: usize, backoff_ms: u64) -> Self {
        Self {
            attempts: attempts.max(1),
            backoff_ms,
        }
    }

    /// Single attempt, no retries.
    pub fn none() -> Self {
        Self::new(1, 0)
    }

    /// Policy from the `[proxy]` section.
    pub fn from_config(config: &ProxyConfig) -> Self {
        Self::new(*config.retry_attempts(), *config.retry_backoff_ms())
    }

    /// Run `call` until it succeeds, fails permanently or attempts run out.
    ///
    /// The last error is returned when every attempt failed.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> CheeseshopResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = CheeseshopResult<T>>,
    {
        let strategy = ExponentialBackoff::from_millis(self.backoff_ms.max(1))
            .factor(2)
            .max_delay(MAX_DELAY)
            .map(jitter)
            .take(self.attempts - 1);

        Retry::spawn(strategy, || {
            let attempt = call();
            async move {
                match attempt.await {
                    Ok(value) => Ok(value),
                    Err(e) if e.is_retryable() => {
                        warn!(operation, error = %e, "Upstream call failed, will retry");
                        Err(RetryError::Transient {
                            err: e,
                            retry_after: None,
                        })
                    }
                    Err(e) => Err(RetryError::Permanent(e)),
                }
            }
        })
        .await
    }
}
