//! 网关模块：组合校验、缓存查找、请求合并生成与结果写入。
//!
//! Gateway composition: validate → cache lookup → coalesced generation → store.
//!
//! A cache hit is answered straight from the store and never touches the
//! coalescer. On a miss, every concurrent caller for the same
//! `(model, prompt)` pair is attached to a single generation run; that run
//! also writes the result to the cache, so the value is stored once no matter
//! how many callers were waiting for it.

mod config;
pub mod dispatch;
mod generator;

pub use config::{GatewayConfig, MAX_TEXT_TTL};
pub use dispatch::{parse_route, HttpReply};

use crate::cache::{BlobStore, CacheEntry, CacheStats, CacheStore, KeyGenerator, MemoryStore};
use crate::drivers::ModelKind;
use crate::resilience::{Backoff, Coalescer, CoalescerStats};
use crate::transport::Backend;
use crate::types::Payload;
use crate::{Error, ErrorContext, Result};
use generator::Generator;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Prompt that browsers request on their own; never a real generation.
pub const RESERVED_KEY: &str = "favicon.ico";

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Cache,
    Generated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayResponse {
    pub payload: Payload,
    pub content_type: String,
    pub source: ResponseSource,
}

#[derive(Debug, Clone, Default)]
pub struct GatewayStats {
    pub cache: CacheStats,
    pub coalescer: CoalescerStats,
}

/// Reject keys that must never reach the cache or the backend.
pub fn validate_request_key(key: &str) -> Result<()> {
    if key.is_empty() || key == RESERVED_KEY {
        return Err(Error::validation_with_context(
            "Please provide a valid prompt.",
            ErrorContext::new()
                .with_field_path("request_key")
                .with_source("gateway"),
        ));
    }
    Ok(())
}

pub struct Gateway {
    config: GatewayConfig,
    keys: KeyGenerator,
    cache: Arc<CacheStore>,
    coalescer: Coalescer<(ModelKind, String), CacheEntry>,
    generator: Arc<Generator>,
}

impl Gateway {
    pub fn builder() -> GatewayBuilder {
        GatewayBuilder::new()
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Serve `request_key` for `kind`, generating and caching it on a miss.
    pub async fn handle(&self, request_key: &str, kind: ModelKind) -> Result<GatewayResponse> {
        validate_request_key(request_key)?;

        let storage_key = self.keys.generate(kind.namespace(), request_key);
        if let Some(entry) = self.cache.get(&storage_key).await? {
            info!(model = %kind, key = %storage_key, "cache HIT");
            return Ok(GatewayResponse {
                payload: entry.payload,
                content_type: entry.content_type,
                source: ResponseSource::Cache,
            });
        }
        info!(model = %kind, key = %storage_key, "cache MISS, generating");

        let cache = Arc::clone(&self.cache);
        let generator = Arc::clone(&self.generator);
        let recheck = self.config.recheck_cache;
        let prompt = request_key.to_string();
        let entry = self
            .coalescer
            .handle((kind, prompt.clone()), move || async move {
                if recheck {
                    if let Some(entry) = cache.get(&storage_key).await? {
                        info!(model = %kind, key = %storage_key, "cache filled while waiting");
                        return Ok(entry);
                    }
                }

                let payload = generator.generate(kind, &prompt).await?;
                let content_type = match cache.put(&storage_key, &payload).await {
                    Ok(content_type) => {
                        info!(model = %kind, key = %storage_key, bytes = payload.len(), "generated and cached");
                        content_type
                    }
                    Err(e) => {
                        // the caller still gets the value; the next request regenerates it
                        warn!(model = %kind, key = %storage_key, "failed to cache generated value: {}", e);
                        cache.content_type_for(&payload)
                    }
                };
                Ok(CacheEntry {
                    payload,
                    content_type,
                })
            })
            .await?;

        Ok(GatewayResponse {
            payload: entry.payload,
            content_type: entry.content_type,
            source: ResponseSource::Generated,
        })
    }

    /// Route-level entry point: parse `path`, serve it and render the reply.
    pub async fn dispatch(&self, path: &str) -> HttpReply {
        let result = match parse_route(path) {
            Ok((kind, prompt)) => self.handle(&prompt, kind).await,
            Err(e) => Err(e),
        };
        HttpReply::from_result(result)
    }

    /// Whether a generation for `(kind, request_key)` is in flight.
    pub fn is_pending(&self, request_key: &str, kind: ModelKind) -> bool {
        self.coalescer.is_pending(&(kind, request_key.to_string()))
    }

    pub fn stats(&self) -> GatewayStats {
        GatewayStats {
            cache: self.cache.stats(),
            coalescer: self.coalescer.stats(),
        }
    }
}

/// Builder for [`Gateway`].
#[derive(Default)]
pub struct GatewayBuilder {
    config: Option<GatewayConfig>,
    backend: Option<Arc<dyn Backend>>,
    store: Option<Arc<dyn BlobStore>>,
}

impl GatewayBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: GatewayConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Blob store for cached payloads. Defaults to an in-process [`MemoryStore`].
    pub fn store(mut self, store: Arc<dyn BlobStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn build(self) -> Result<Gateway> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let backend = self.backend.ok_or_else(|| {
            Error::configuration_with_context(
                "a backend is required",
                ErrorContext::new()
                    .with_field_path("backend")
                    .with_source("gateway_builder"),
            )
        })?;
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()) as Arc<dyn BlobStore>);

        let keys = KeyGenerator::new(config.fingerprint_length)?;
        let cache = Arc::new(CacheStore::new(config.cache_config(), store));
        debug!(
            store = cache.backend_name(),
            fingerprint_length = keys.length(),
            max_retries = config.retry.max_retries,
            "gateway ready"
        );
        let generator = Arc::new(Generator::new(
            backend,
            Backoff::new(config.retry.clone()),
            config.max_concurrent_generations,
        ));

        Ok(Gateway {
            config,
            keys,
            cache,
            coalescer: Coalescer::new(),
            generator,
        })
    }
}
