//! Retry executor.
//!
//! One configurable policy object (max attempts, backoff schedule,
//! retryable predicate) consumed by a single generic combinator. Each
//! client instantiates its own policy instead of re-implementing the loop.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::{Error, Result};

type BackoffFn = dyn Fn(u32) -> Duration + Send + Sync;
type RetryableFn = dyn Fn(&Error) -> bool + Send + Sync;

/// Configuration for retry behavior.
#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Arc<BackoffFn>,
    retryable: Arc<RetryableFn>,
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .finish()
    }
}

impl RetryPolicy {
    pub fn new<B, R>(max_attempts: u32, backoff: B, retryable: R) -> Self
    where
        B: Fn(u32) -> Duration + Send + Sync + 'static,
        R: Fn(&Error) -> bool + Send + Sync + 'static,
    {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: Arc::new(backoff),
            retryable: Arc::new(retryable),
        }
    }

    /// Default policy for the transcription, grammar-check, scoring and
    /// generation paths: 3 attempts, exponential backoff (2s, 4s between
    /// attempts), retrying transport failures and non-success statuses
    /// alike.
    pub fn standard() -> Self {
        Self::new(
            3,
            |attempt| Duration::from_secs(1u64 << attempt),
            Error::is_transport_shaped,
        )
    }

    /// Policy for grammar correction: a single retry after a fixed 1s wait,
    /// and only for true network failures. HTTP-status errors on this path
    /// are classified as non-retryable variants before the predicate runs.
    pub fn strict() -> Self {
        Self::new(2, |_| Duration::from_secs(1), Error::is_transport)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Keep this policy's attempt budget and predicate but swap the backoff
    /// schedule. Used by tests that assert attempt counts without waiting
    /// out multi-second delays.
    pub fn with_backoff<B>(mut self, backoff: B) -> Self
    where
        B: Fn(u32) -> Duration + Send + Sync + 'static,
    {
        self.backoff = Arc::new(backoff);
        self
    }

    fn backoff_delay(&self, retry_index: u32) -> Duration {
        (self.backoff)(retry_index)
    }

    fn is_retryable(&self, err: &Error) -> bool {
        (self.retryable)(err)
    }
}

/// Run `op` under `policy`, racing every attempt and every backoff wait
/// against `cancel`.
///
/// `op` is invoked once per attempt; it must rebuild its request from
/// captured inputs each time. Cancellation aborts the in-flight attempt and
/// never enters a backoff wait.
pub async fn execute<T, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt: u32 = 0;
    loop {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            result = op() => result,
        };

        let err = match result {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        attempt += 1;
        if attempt >= policy.max_attempts() || !policy.is_retryable(&err) {
            return Err(err);
        }

        let delay = policy.backoff_delay(attempt);
        tracing::debug!(
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "retrying after backoff"
        );
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
