//! Content-type aware cache adapter over a [`BlobStore`].

use super::backend::{BlobStore, PutOptions};
use super::key::StorageKey;
use crate::types::{Payload, PayloadKind, DEFAULT_BINARY_CONTENT_TYPE, TEXT_CONTENT_TYPE};
use crate::{Error, ErrorContext, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Expiry hint attached to text entries.
    pub text_ttl: Option<Duration>,
    /// Content type written for binary entries.
    pub binary_content_type: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            text_ttl: Some(Duration::from_secs(86_400)),
            binary_content_type: DEFAULT_BINARY_CONTENT_TYPE.to_string(),
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_text_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.text_ttl = ttl;
        self
    }
    pub fn with_binary_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.binary_content_type = content_type.into();
        self
    }
}

/// A decoded cache hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub payload: Payload,
    pub content_type: String,
}

#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub errors: u64,
}

impl CacheStats {
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Default)]
struct AtomicStats {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    errors: AtomicU64,
}

impl AtomicStats {
    fn to_stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            sets: self.sets.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

pub struct CacheStore {
    config: CacheConfig,
    backend: Arc<dyn BlobStore>,
    stats: AtomicStats,
}

impl CacheStore {
    pub fn new(config: CacheConfig, backend: Arc<dyn BlobStore>) -> Self {
        Self {
            config,
            backend,
            stats: AtomicStats::default(),
        }
    }

    /// Look up `key`. `Ok(None)` means absent; an empty payload is a hit.
    ///
    /// Decoding follows the kind recorded at write time, not the content type.
    pub async fn get(&self, key: &StorageKey) -> Result<Option<CacheEntry>> {
        let store_key = key.to_store_key();
        let object = match self.backend.get(&store_key).await {
            Ok(Some(object)) => object,
            Ok(None) => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                return Ok(None);
            }
            Err(e) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                return Err(e);
            }
        };

        let payload = match object.kind {
            PayloadKind::Text => match String::from_utf8(object.data.to_vec()) {
                Ok(text) => Payload::Text(text),
                Err(e) => {
                    self.stats.errors.fetch_add(1, Ordering::Relaxed);
                    return Err(Error::store_with_context(
                        "cached text entry is not valid UTF-8",
                        ErrorContext::new()
                            .with_field_path(store_key)
                            .with_details(e.to_string())
                            .with_source("cache_store"),
                    ));
                }
            },
            PayloadKind::Binary => Payload::Binary(object.data),
        };

        self.stats.hits.fetch_add(1, Ordering::Relaxed);
        Ok(Some(CacheEntry {
            payload,
            content_type: object.content_type,
        }))
    }

    /// Write `payload` under `key` and return the content type it was stored with.
    pub async fn put(&self, key: &StorageKey, payload: &Payload) -> Result<String> {
        let options = self.put_options(payload);
        let content_type = options.content_type.clone();
        match self
            .backend
            .put(&key.to_store_key(), payload.to_bytes(), options)
            .await
        {
            Ok(()) => {
                self.stats.sets.fetch_add(1, Ordering::Relaxed);
                Ok(content_type)
            }
            Err(e) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    /// Content type a payload is served and stored with.
    pub fn content_type_for(&self, payload: &Payload) -> String {
        match payload {
            Payload::Text(_) => TEXT_CONTENT_TYPE.to_string(),
            Payload::Binary(_) => self.config.binary_content_type.clone(),
        }
    }

    fn put_options(&self, payload: &Payload) -> PutOptions {
        PutOptions {
            content_type: self.content_type_for(payload),
            kind: payload.kind(),
            expiration_ttl: match payload {
                Payload::Text(_) => self.config.text_ttl,
                Payload::Binary(_) => None,
            },
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.to_stats()
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::backend::{MemoryStore, StoredObject};
    use async_trait::async_trait;
    use bytes::Bytes;

    fn store() -> (CacheStore, Arc<MemoryStore>) {
        let backend = Arc::new(MemoryStore::new());
        (CacheStore::new(CacheConfig::default(), backend.clone()), backend)
    }

    fn key(hash: &str) -> StorageKey {
        StorageKey::new(hash).with_namespace("test")
    }

    #[tokio::test]
    async fn test_text_roundtrip() {
        let (cache, _) = store();
        let samples = [
            "",
            "meow",
            "héllo wörld — 日本語 🐱",
            "line\nbreak\ttab\u{0}nul\u{7f}del\r\n",
        ];
        for (i, s) in samples.iter().enumerate() {
            let k = key(&format!("t{}", i));
            let ct = cache.put(&k, &Payload::Text(s.to_string())).await.unwrap();
            assert_eq!(ct, TEXT_CONTENT_TYPE);
            let entry = cache.get(&k).await.unwrap().expect("present");
            assert_eq!(entry.payload, Payload::Text(s.to_string()));
            assert_eq!(entry.content_type, TEXT_CONTENT_TYPE);
        }
    }

    #[tokio::test]
    async fn test_binary_roundtrip() {
        let (cache, _) = store();
        let all_bytes: Vec<u8> = (0..=255u8).collect();
        let invalid_utf8 = vec![0xff, 0xfe, 0x00, 0xc3];
        let samples = [vec![], vec![0u8; 1024], all_bytes, invalid_utf8];
        for (i, data) in samples.iter().enumerate() {
            let k = key(&format!("b{}", i));
            let payload = Payload::Binary(Bytes::from(data.clone()));
            let ct = cache.put(&k, &payload).await.unwrap();
            assert_eq!(ct, "image/png");
            let entry = cache.get(&k).await.unwrap().expect("present");
            assert_eq!(entry.payload, payload);
        }
    }

    #[tokio::test]
    async fn test_absent_is_not_empty() {
        let (cache, _) = store();
        assert!(cache.get(&key("nope")).await.unwrap().is_none());
        cache.put(&key("empty"), &Payload::Text(String::new())).await.unwrap();
        assert_eq!(
            cache.get(&key("empty")).await.unwrap().unwrap().payload,
            Payload::Text(String::new())
        );
        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.sets, 1);
        assert_eq!(stats.hit_ratio(), 0.5);
    }

    #[tokio::test]
    async fn test_text_entries_carry_ttl_binary_do_not() {
        let (cache, _) = store();
        let text = cache.put_options(&Payload::Text("x".into()));
        assert_eq!(text.expiration_ttl, Some(Duration::from_secs(86_400)));
        let bin = cache.put_options(&Payload::Binary(Bytes::from_static(b"x")));
        assert_eq!(bin.expiration_ttl, None);
    }

    #[tokio::test]
    async fn test_corrupt_text_is_a_store_error() {
        let (cache, backend) = store();
        backend
            .put(
                "test/bad",
                Bytes::from_static(&[0xff, 0xfe]),
                PutOptions {
                    content_type: TEXT_CONTENT_TYPE.into(),
                    kind: PayloadKind::Text,
                    expiration_ttl: None,
                },
            )
            .await
            .unwrap();
        let err = cache.get(&key("bad")).await.unwrap_err();
        assert!(matches!(err, Error::Store { .. }));
        assert_eq!(cache.stats().errors, 1);
    }

    #[tokio::test]
    async fn test_binary_under_text_content_type_is_not_decoded() {
        let config = CacheConfig::new().with_binary_content_type(TEXT_CONTENT_TYPE);
        let cache = CacheStore::new(config, Arc::new(MemoryStore::new()));
        let png = Payload::Binary(Bytes::from_static(&[0x89, b'P', b'N', b'G', 0xff]));
        let ct = cache.put(&key("img"), &png).await.unwrap();
        assert_eq!(ct, TEXT_CONTENT_TYPE);

        let entry = cache.get(&key("img")).await.unwrap().unwrap();
        assert_eq!(entry.payload, png);
        assert_eq!(cache.stats().errors, 0);
    }

    struct BrokenStore;

    #[async_trait]
    impl BlobStore for BrokenStore {
        async fn get(&self, _: &str) -> Result<Option<StoredObject>> {
            Err(Error::store_with_context("unavailable", ErrorContext::new()))
        }
        async fn put(&self, _: &str, _: Bytes, _: PutOptions) -> Result<()> {
            Err(Error::store_with_context("unavailable", ErrorContext::new()))
        }
        fn name(&self) -> &'static str {
            "broken"
        }
    }

    #[tokio::test]
    async fn test_store_outage_propagates() {
        let cache = CacheStore::new(CacheConfig::default(), Arc::new(BrokenStore));
        assert!(cache.get(&key("k")).await.is_err());
        assert!(cache.put(&key("k"), &Payload::Text("v".into())).await.is_err());
        assert_eq!(cache.stats().errors, 2);
        assert_eq!(cache.backend_name(), "broken");
    }
}
