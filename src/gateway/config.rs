//! Gateway configuration.

use crate::cache::{validate_length, CacheConfig, DEFAULT_FINGERPRINT_LENGTH};
use crate::resilience::BackoffConfig;
use crate::types::DEFAULT_BINARY_CONTENT_TYPE;
use crate::{Error, ErrorContext, Result};
use std::env;
use std::time::Duration;

/// Longest accepted text TTL (ten years).
pub const MAX_TEXT_TTL: Duration = Duration::from_secs(10 * 365 * 86_400);

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Hex characters kept from the SHA-256 fingerprint.
    pub fingerprint_length: usize,
    pub retry: BackoffConfig,
    /// Expiry hint for cached text.
    pub text_ttl: Option<Duration>,
    /// Content type stored and served for generated images.
    pub image_content_type: String,
    /// Cap on concurrent backend attempts across all keys. `None` disables the limit.
    pub max_concurrent_generations: Option<usize>,
    /// Look the cache up again once admitted as the single in-flight run, so a
    /// request that missed just before another run stored its value does not
    /// generate a second time. Off by default: a miss then costs one store read.
    pub recheck_cache: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            fingerprint_length: DEFAULT_FINGERPRINT_LENGTH,
            retry: BackoffConfig::default(),
            text_ttl: Some(Duration::from_secs(86_400)),
            image_content_type: DEFAULT_BINARY_CONTENT_TYPE.to_string(),
            max_concurrent_generations: None,
            recheck_cache: false,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.trim().parse::<T>().ok())
}

impl GatewayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `GATEWAY_*` environment variables.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(len) = env_parse::<usize>("GATEWAY_FINGERPRINT_LENGTH") {
            cfg.fingerprint_length = len;
        }
        if let Some(retries) = env_parse::<u32>("GATEWAY_MAX_RETRIES") {
            cfg.retry.max_retries = retries;
        }
        if let Some(ms) = env_parse::<u64>("GATEWAY_BASE_DELAY_MS") {
            cfg.retry.base_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = env_parse::<u64>("GATEWAY_MAX_DELAY_MS") {
            cfg.retry.max_delay = Some(Duration::from_millis(ms));
        }
        if let Some(secs) = env_parse::<u64>("GATEWAY_TEXT_TTL_SECS") {
            // 0 disables the hint
            cfg.text_ttl = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(n) = env_parse::<usize>("GATEWAY_MAX_CONCURRENT") {
            cfg.max_concurrent_generations = (n > 0).then_some(n);
        }
        if let Some(recheck) = env_parse::<bool>("GATEWAY_RECHECK_CACHE") {
            cfg.recheck_cache = recheck;
        }
        cfg
    }

    pub fn with_fingerprint_length(mut self, length: usize) -> Self {
        self.fingerprint_length = length;
        self
    }

    pub fn with_retry(mut self, retry: BackoffConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_text_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.text_ttl = ttl;
        self
    }

    pub fn with_image_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.image_content_type = content_type.into();
        self
    }

    pub fn with_max_concurrent_generations(mut self, limit: Option<usize>) -> Self {
        self.max_concurrent_generations = limit;
        self
    }

    pub fn with_recheck_cache(mut self, recheck: bool) -> Self {
        self.recheck_cache = recheck;
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_length(self.fingerprint_length)?;
        if self.max_concurrent_generations == Some(0) {
            return Err(Error::configuration_with_context(
                "max_concurrent_generations must be at least 1",
                ErrorContext::new()
                    .with_field_path("max_concurrent_generations")
                    .with_source("gateway_config"),
            ));
        }
        if self.text_ttl.map_or(false, |ttl| ttl > MAX_TEXT_TTL) {
            return Err(Error::configuration_with_context(
                "text_ttl exceeds the supported maximum",
                ErrorContext::new()
                    .with_field_path("text_ttl")
                    .with_details(format!("max {}s", MAX_TEXT_TTL.as_secs()))
                    .with_source("gateway_config"),
            ));
        }
        if self.image_content_type.trim().is_empty() {
            return Err(Error::configuration_with_context(
                "image content type must not be empty",
                ErrorContext::new()
                    .with_field_path("image_content_type")
                    .with_source("gateway_config"),
            ));
        }
        Ok(())
    }

    pub(crate) fn cache_config(&self) -> CacheConfig {
        CacheConfig::new()
            .with_text_ttl(self.text_ttl)
            .with_binary_content_type(self.image_content_type.clone())
    }
}
