//! 传输层：以不透明的 "send(endpoint, body)" 能力调用推理后端。
//!
//! Backend transport: the opaque "send(endpoint, body) -> response" capability.

mod http;

pub use http::{HttpBackend, HttpBackendConfig};

use crate::Result;
use async_trait::async_trait;
use bytes::Bytes;

/// Raw backend answer. Non-success statuses are returned, not raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendResponse {
    pub status: u16,
    pub body: Bytes,
}

impl BackendResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as lossy UTF-8, for diagnostics.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Inference backend the gateway generates with.
///
/// Implementations only move bytes; authentication or request signing is
/// their own concern.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Invoke URL for a model.
    fn endpoint(&self, model_id: &str) -> String;

    /// POST a JSON body to `endpoint`.
    async fn invoke(&self, endpoint: &str, body: Bytes) -> Result<BackendResponse>;
}
