//! 内容寻址缓存模块：以请求指纹为键持久化生成结果，区分文本与二进制内容。
//!
//! # Content-Addressed Cache Module
//!
//! Generated payloads are persisted under keys derived from a SHA-256
//! fingerprint of the request, so repeated prompts are served without
//! contacting the backend again.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`fingerprint`] | Truncated hex digest of a request key |
//! | [`KeyGenerator`] | Namespaced [`StorageKey`] derivation |
//! | [`CacheStore`] | Text/binary aware get/put with statistics |
//! | [`BlobStore`] | Trait for the physical key-value store |
//! | [`MemoryStore`] | In-process store (tests, single-node use) |
//! | [`FsStore`] | Durable directory-backed store |
//!
//! ## Example
//!
//! ```rust
//! use prompt_gateway::cache::{CacheConfig, CacheStore, KeyGenerator, MemoryStore};
//! use prompt_gateway::types::Payload;
//! use std::sync::Arc;
//!
//! # async fn run() -> prompt_gateway::Result<()> {
//! let cache = CacheStore::new(CacheConfig::default(), Arc::new(MemoryStore::new()));
//! let key = KeyGenerator::default().generate("text", "a cat");
//! cache.put(&key, &Payload::Text("meow".into())).await?;
//! assert!(cache.get(&key).await?.is_some());
//! # Ok(())
//! # }
//! ```
//!
//! Text entries are stored as UTF-8 with `text/plain; charset=utf-8`; binary
//! entries are stored untouched. Nothing is ever evicted by this module.

mod backend;
mod key;
mod manager;

pub use backend::{BlobStore, FsStore, MemoryStore, PutOptions, StoredObject};
pub use key::{
    fingerprint, validate_length, KeyGenerator, StorageKey, DEFAULT_FINGERPRINT_LENGTH,
    MAX_FINGERPRINT_LENGTH,
};
pub use manager::{CacheConfig, CacheEntry, CacheStats, CacheStore};
