//! Bounded retry for transient completion failures

use super::{LlmError, LlmRequest, LlmResponse, LlmService};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Explicit retry policy: how many times, how long to wait, and for which errors.
///
/// Only errors whose kind is retryable (network, timeout, 5xx) are eligible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
    /// Upper bound applied to both the backoff and server `retry-after` hints
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            backoff: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Policy that surfaces every error immediately
    #[allow(dead_code)] // Used in tests
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn should_retry(&self, error: &LlmError, retries_so_far: u32) -> bool {
        error.kind.is_retryable() && retries_so_far < self.max_retries
    }

    /// Delay before retry number `retry` (zero-based); doubles each time
    pub fn delay_for(&self, error: &LlmError, retry: u32) -> Duration {
        let backoff = self.backoff.saturating_mul(1 << retry.min(16));
        error.retry_after.unwrap_or(backoff).min(self.max_delay)
    }
}

/// Wraps a service with a bounded retry policy
pub struct RetryingService {
    inner: Arc<dyn LlmService>,
    policy: RetryPolicy,
}

impl RetryingService {
    pub fn new(inner: Arc<dyn LlmService>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl LlmService for RetryingService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let mut retries = 0;
        loop {
            match self.inner.complete(request).await {
                Ok(response) => return Ok(response),
                Err(e) if self.policy.should_retry(&e, retries) => {
                    let delay = self.policy.delay_for(&e, retries);
                    retries += 1;
                    tracing::warn!(
                        model = %self.inner.model_id(),
                        error = %e.message,
                        retry = retries,
                        delay_ms = %delay.as_millis(),
                        "Transient LLM failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }
}
