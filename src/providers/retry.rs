/*!
 * Retry adapter around a translation provider.
 *
 * Transient failures (connection errors, rate limiting, 5xx) are retried with
 * exponential backoff; authentication, quota and other client errors are
 * returned immediately. An optional fixed delay is inserted before every call
 * to stay under provider rate limits.
 */

use std::time::Duration;

use async_trait::async_trait;
use log::{error, warn};

use crate::errors::ProviderError;
use crate::providers::Translator;

/// Retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Backoff before the first retry, doubled for each further retry
    pub backoff_base_ms: u64,
    /// Fixed pause before every call, 0 to disable
    pub rate_limit_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base_ms: 1000,
            rate_limit_delay_ms: 0,
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `attempt` (1-based)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.backoff_base_ms.saturating_mul(factor))
    }
}

/// Wraps any [`Translator`] with retry and rate limiting
#[derive(Debug)]
pub struct RetryingTranslator<T> {
    inner: T,
    policy: RetryPolicy,
}

impl<T: Translator> RetryingTranslator<T> {
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }
}

#[async_trait]
impl<T: Translator> Translator for RetryingTranslator<T> {
    async fn translate(
        &self,
        text: &str,
        target_language: &str,
        source_language: Option<&str>,
    ) -> Result<String, ProviderError> {
        let mut attempt = 0;

        loop {
            if self.policy.rate_limit_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.policy.rate_limit_delay_ms)).await;
            }

            match self.inner.translate(text, target_language, source_language).await {
                Ok(translated) => return Ok(translated),
                Err(e) if e.is_transient() && attempt < self.policy.max_retries => {
                    attempt += 1;
                    let backoff = self.policy.backoff_for(attempt);
                    warn!("{} call failed: {} - retry {}/{} in {}ms",
                          self.inner.name(), e, attempt, self.policy.max_retries, backoff.as_millis());
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => {
                    error!("{} call failed after {} attempt(s): {}", self.inner.name(), attempt + 1, e);
                    return Err(e);
                }
            }
        }
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
