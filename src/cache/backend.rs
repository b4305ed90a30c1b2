//! Blob store implementations.

use crate::types::PayloadKind;
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Object as read back from a blob store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub data: Bytes,
    pub content_type: String,
    /// Encoding recorded at write time; decides how the bytes are read back.
    pub kind: PayloadKind,
}

/// Options attached to a write.
#[derive(Debug, Clone)]
pub struct PutOptions {
    pub content_type: String,
    pub kind: PayloadKind,
    /// Expiry hint; stores that cannot expire objects ignore it.
    pub expiration_ttl: Option<Duration>,
}

/// Opaque key-value blob store the cache adapter sits on.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<StoredObject>>;
    async fn put(&self, key: &str, data: Bytes, options: PutOptions) -> Result<()>;
    fn name(&self) -> &'static str;
}

#[derive(Clone)]
struct MemoryEntry {
    object: StoredObject,
    expires_at: Option<Instant>,
}

impl MemoryEntry {
    fn is_expired(&self) -> bool {
        self.expires_at
            .map(|at| Instant::now() >= at)
            .unwrap_or(false)
    }
}

/// In-process store. No eviction; entries only disappear once their TTL passes.
#[derive(Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, MemoryEntry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .map(|e| e.values().filter(|v| !v.is_expired()).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> Error {
    Error::store_with_context(
        "memory store lock poisoned",
        ErrorContext::new().with_source("memory_store"),
    )
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<StoredObject>> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        if let Some(entry) = entries.get(key) {
            if entry.is_expired() {
                entries.remove(key);
                return Ok(None);
            }
            return Ok(Some(entry.object.clone()));
        }
        Ok(None)
    }

    async fn put(&self, key: &str, data: Bytes, options: PutOptions) -> Result<()> {
        let entry = MemoryEntry {
            object: StoredObject {
                data,
                content_type: options.content_type,
                kind: options.kind,
            },
            // a TTL past the clock's range never expires
            expires_at: options
                .expiration_ttl
                .and_then(|ttl| Instant::now().checked_add(ttl)),
        };
        self.entries
            .write()
            .map_err(|_| poisoned())?
            .insert(key.to_string(), entry);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Metadata sidecar written next to every payload by [`FsStore`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ObjectMeta {
    content_type: String,
    /// Missing in sidecars written before the tag existed.
    #[serde(default)]
    kind: Option<PayloadKind>,
    /// Unix seconds after which the object is treated as absent.
    expires_at: Option<u64>,
}

/// Durable store rooted at a directory.
///
/// Each object is a payload file plus a `.meta.json` sidecar. Both are written
/// to a temporary name and renamed into place, payload first, so a reader never
/// sees metadata for a half-written payload.
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| fs_error("create store root", &root, e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn paths(&self, key: &str) -> Result<(PathBuf, PathBuf)> {
        // keys are `namespace/hex`; refuse anything that could escape the root
        if key.is_empty()
            || key
                .split('/')
                .any(|seg| seg.is_empty() || seg == "." || seg == "..")
            || key.contains('\\')
        {
            return Err(Error::store_with_context(
                "invalid store key",
                ErrorContext::new()
                    .with_details(key.to_string())
                    .with_source("fs_store"),
            ));
        }
        let data = self.root.join(key);
        let meta = self.root.join(format!("{}.meta.json", key));
        Ok((data, meta))
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn fs_error(action: &str, path: &Path, e: std::io::Error) -> Error {
    Error::store_with_context(
        format!("{}: {}", action, e),
        ErrorContext::new()
            .with_field_path(path.display().to_string())
            .with_source("fs_store"),
    )
}

async fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let tmp = path.with_extension(format!("tmp-{}", Uuid::new_v4()));
    tokio::fs::write(&tmp, contents)
        .await
        .map_err(|e| fs_error("write", &tmp, e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| fs_error("rename", path, e))
}

#[async_trait]
impl BlobStore for FsStore {
    async fn get(&self, key: &str) -> Result<Option<StoredObject>> {
        let (data_path, meta_path) = self.paths(key)?;
        let meta_raw = match tokio::fs::read(&meta_path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(fs_error("read metadata", &meta_path, e)),
        };
        let meta: ObjectMeta = serde_json::from_slice(&meta_raw).map_err(|e| {
            Error::store_with_context(
                format!("corrupt metadata: {}", e),
                ErrorContext::new()
                    .with_field_path(meta_path.display().to_string())
                    .with_source("fs_store"),
            )
        })?;
        if meta.expires_at.map(|at| unix_now() >= at).unwrap_or(false) {
            return Ok(None);
        }
        let data = tokio::fs::read(&data_path)
            .await
            .map_err(|e| fs_error("read payload", &data_path, e))?;
        let kind = meta
            .kind
            .unwrap_or_else(|| PayloadKind::from_content_type(&meta.content_type));
        Ok(Some(StoredObject {
            data: Bytes::from(data),
            content_type: meta.content_type,
            kind,
        }))
    }

    async fn put(&self, key: &str, data: Bytes, options: PutOptions) -> Result<()> {
        let (data_path, meta_path) = self.paths(key)?;
        if let Some(parent) = data_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| fs_error("create namespace", parent, e))?;
        }
        let meta = ObjectMeta {
            content_type: options.content_type,
            kind: Some(options.kind),
            expires_at: options
                .expiration_ttl
                .and_then(|ttl| unix_now().checked_add(ttl.as_secs())),
        };
        write_atomic(&data_path, &data).await?;
        write_atomic(&meta_path, &serde_json::to_vec(&meta)?).await
    }

    fn name(&self) -> &'static str {
        "fs"
    }
}
