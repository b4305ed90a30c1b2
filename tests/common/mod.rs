//! Shared fixtures for gateway integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;
use prompt_gateway::cache::{BlobStore, MemoryStore, PutOptions, StoredObject};
use prompt_gateway::{Backend, BackendResponse, Error, ErrorContext, Result};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn claude_body(text: &str) -> BackendResponse {
    let body = serde_json::json!({ "content": [{ "type": "text", "text": text }] });
    BackendResponse::new(200, serde_json::to_vec(&body).unwrap())
}

pub fn gpt_body(text: &str) -> BackendResponse {
    let body = serde_json::json!({ "choices": [{ "message": { "content": text } }] });
    BackendResponse::new(200, serde_json::to_vec(&body).unwrap())
}

pub fn titan_body(image: &[u8]) -> BackendResponse {
    let encoded = base64::engine::general_purpose::STANDARD.encode(image);
    let body = serde_json::json!({ "images": [encoded] });
    BackendResponse::new(200, serde_json::to_vec(&body).unwrap())
}

/// Backend that replays a script and counts invocations.
///
/// Once the script is exhausted the last response is repeated.
pub struct ScriptedBackend {
    script: Mutex<VecDeque<BackendResponse>>,
    last: Mutex<Option<BackendResponse>>,
    latency: Duration,
    calls: AtomicUsize,
    endpoints: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new(script: Vec<BackendResponse>) -> Arc<Self> {
        Self::with_latency(script, Duration::ZERO)
    }

    pub fn with_latency(script: Vec<BackendResponse>, latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            latency,
            calls: AtomicUsize::new(0),
            endpoints: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn endpoints(&self) -> Vec<String> {
        self.endpoints.lock().unwrap().clone()
    }

    fn next_response(&self) -> BackendResponse {
        let next = self.script.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        if let Some(resp) = next {
            *last = Some(resp);
        }
        last.clone().expect("empty backend script")
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    fn endpoint(&self, model_id: &str) -> String {
        format!("mock://bedrock/model/{}/invoke", model_id)
    }

    async fn invoke(&self, endpoint: &str, _body: Bytes) -> Result<BackendResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.endpoints.lock().unwrap().push(endpoint.to_string());
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok(self.next_response())
    }
}

/// Wraps a [`MemoryStore`], counting calls and optionally failing them.
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryStore,
    gets: AtomicUsize,
    puts: AtomicUsize,
    fail_gets: bool,
    fail_puts: bool,
}

impl CountingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_puts() -> Arc<Self> {
        Arc::new(Self {
            fail_puts: true,
            ..Self::default()
        })
    }

    pub fn failing_gets() -> Arc<Self> {
        Arc::new(Self {
            fail_gets: true,
            ..Self::default()
        })
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

fn outage(op: &str) -> Error {
    Error::store_with_context(
        format!("{} unavailable", op),
        ErrorContext::new().with_source("counting_store"),
    )
}

#[async_trait]
impl BlobStore for CountingStore {
    async fn get(&self, key: &str) -> Result<Option<StoredObject>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.fail_gets {
            return Err(outage("get"));
        }
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, data: Bytes, options: PutOptions) -> Result<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.fail_puts {
            return Err(outage("put"));
        }
        self.inner.put(key, data, options).await
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}
