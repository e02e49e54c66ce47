//! Retrying decorator for content backends.
//!
//! The engine surfaces backend failures immediately. Hosts that want
//! transient faults absorbed wrap their backend in [`RetryingContent`].

use crate::{ContentBackend, RetryConfig};
use larder_error::LarderResult;
use std::future::Future;
use std::time::Duration;
use tokio_retry2::strategy::{ExponentialBackoff, jitter};
use tokio_retry2::{Retry, RetryError};
use tracing::warn;

/// Backend wrapper that retries retryable failures with exponential backoff.
///
/// Only errors reporting [`larder_error::LarderError::is_retryable`] are repeated; missing
/// content and malformed identifiers fail on the first attempt.
#[derive(Debug, Clone)]
pub struct RetryingContent<B> {
    inner: B,
    config: RetryConfig,
}

impl<B: ContentBackend> RetryingContent<B> {
    /// Wrap `inner` with the given retry policy.
    pub fn new(inner: B, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    /// The wrapped backend.
    pub fn inner(&self) -> &B {
        &self.inner
    }

    async fn attempt<T, F, Fut>(&self, operation: &'static str, f: F) -> LarderResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = LarderResult<T>>,
    {
        let strategy = ExponentialBackoff::from_millis(*self.config.initial_backoff_ms())
            .factor(2)
            .max_delay(Duration::from_secs(*self.config.max_delay_secs()))
            .map(jitter)
            .take(*self.config.max_retries());

        let f = &f;
        Retry::spawn(strategy, move || async move {
            match f().await {
                Ok(value) => Ok(value),
                Err(e) if e.is_retryable() => {
                    warn!(backend = self.inner.name(), operation, error = %e, "Transient backend error, will retry");
                    Err(RetryError::Transient {
                        err: e,
                        retry_after: None,
                    })
                }
                Err(e) => Err(RetryError::Permanent(e)),
            }
        })
        .await
    }
}

#[async_trait::async_trait]
impl<B: ContentBackend> ContentBackend for RetryingContent<B> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn write_contents(&self, contents: &[u8]) -> LarderResult<String> {
        self.attempt("write", || self.inner.write_contents(contents))
            .await
    }

    async fn read_contents(&self, id: &str) -> LarderResult<Option<Vec<u8>>> {
        self.attempt("read", || self.inner.read_contents(id)).await
    }

    async fn remove_contents(&self, id: &str) -> LarderResult<()> {
        self.attempt("remove", || self.inner.remove_contents(id))
            .await
    }
}
