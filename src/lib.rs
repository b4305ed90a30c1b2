//! # prompt-gateway
//!
//! 合并式缓存网关：在模型推理后端之前提供请求合并、内容寻址缓存和退避重试。
//!
//! A coalescing cache gateway in front of a model-inference backend.
//!
//! ## Overview
//!
//! Callers ask for a value identified by a request key (a prompt) and a model.
//! The gateway answers from a persistent content-addressed cache when it can.
//! On a miss, all concurrent callers for the same key share a single backend
//! generation, which is retried with exponential backoff on transient
//! upstream failures and stored once when it succeeds.
//!
//! ## Request Flow
//!
//! 1. Validate the request key (empty keys and `favicon.ico` are rejected).
//! 2. Derive the storage key from a truncated SHA-256 fingerprint.
//! 3. Cache hit: return the stored payload.
//! 4. Cache miss: join or start the in-flight generation, then store it.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use prompt_gateway::{Gateway, GatewayConfig, HttpBackend, HttpBackendConfig, ModelKind};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> prompt_gateway::Result<()> {
//!     let backend = HttpBackend::new(HttpBackendConfig::from_env())?;
//!     let gateway = Gateway::builder()
//!         .config(GatewayConfig::from_env())
//!         .backend(Arc::new(backend))
//!         .build()?;
//!
//!     let response = gateway.handle("a haiku about rust", ModelKind::ClaudeSonnet).await?;
//!     println!("{}", response.payload.as_text().unwrap_or_default());
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`gateway`] | Composition root, configuration and route helpers |
//! | [`cache`] | Fingerprints, blob stores and the content-type aware cache |
//! | [`resilience`] | Request coalescing and backoff |
//! | [`drivers`] | Per-model request bodies and response parsing |
//! | [`transport`] | Backend invocation over HTTP |
//! | [`types`] | Payload types shared across modules |

pub mod cache;
pub mod drivers;
pub mod gateway;
pub mod resilience;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use drivers::ModelKind;
pub use gateway::{
    Gateway, GatewayBuilder, GatewayConfig, GatewayResponse, GatewayStats, HttpReply,
    ResponseSource,
};
pub use transport::{Backend, BackendResponse, HttpBackend, HttpBackendConfig};
pub use types::Payload;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
