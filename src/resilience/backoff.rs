//! Bounded exponential backoff around a single unit of work.

use crate::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Configuration for retry logic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffConfig {
    /// Retries after the initial attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubled after every retry.
    pub base_delay: Duration,
    /// Optional ceiling on a single delay. `None` keeps pure doubling.
    pub max_delay: Option<Duration>,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: None,
        }
    }
}

impl BackoffConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Option<Duration>) -> Self {
        self.max_delay = delay;
        self
    }
}

/// Retries an operation on classified failures, sleeping between attempts.
#[derive(Debug, Clone, Default)]
pub struct Backoff {
    config: BackoffConfig,
}

impl Backoff {
    pub fn new(config: BackoffConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BackoffConfig {
        &self.config
    }

    /// Delay slept after the `retry`-th failure (0-based): `base * 2^retry`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        let delay = self.config.base_delay.saturating_mul(factor);
        match self.config.max_delay {
            Some(cap) => delay.min(cap),
            None => delay,
        }
    }

    /// Upper bound on time spent sleeping when every retry is used.
    pub fn max_total_delay(&self) -> Duration {
        (0..self.config.max_retries)
            .map(|r| self.delay_for(r))
            .fold(Duration::ZERO, |acc, d| acc.saturating_add(d))
    }

    /// Run `operation` with the default predicate ([`Error::is_retryable`]).
    pub async fn execute<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.execute_with(operation, Error::is_retryable).await
    }

    /// Run `operation` up to `max_retries + 1` times.
    ///
    /// Failures rejected by `is_retryable` propagate immediately. When retries
    /// run out, the last error is returned as-is.
    pub async fn execute_with<T, F, Fut, P>(&self, mut operation: F, is_retryable: P) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        P: Fn(&Error) -> bool,
    {
        let mut retry = 0u32;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if retry < self.config.max_retries && is_retryable(&e) => {
                    let delay = self.delay_for(retry);
                    warn!(
                        status = ?e.status(),
                        ?delay,
                        attempt = retry + 1,
                        max_retries = self.config.max_retries,
                        "upstream failure, retrying: {}",
                        e
                    );
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
