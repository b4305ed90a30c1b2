//! Backoff-wrapped generation against the backend.

use crate::drivers::ModelKind;
use crate::resilience::Backoff;
use crate::transport::Backend;
use crate::types::Payload;
use crate::{Error, ErrorContext, Result};
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error};

pub(crate) struct Generator {
    backend: Arc<dyn Backend>,
    backoff: Backoff,
    /// Optional cap on concurrent backend attempts.
    inflight: Option<Arc<Semaphore>>,
}

impl Generator {
    pub fn new(backend: Arc<dyn Backend>, backoff: Backoff, max_concurrent: Option<usize>) -> Self {
        Self {
            backend,
            backoff,
            inflight: max_concurrent.map(|n| Arc::new(Semaphore::new(n))),
        }
    }

    /// Generate a payload for `prompt`, retrying transient upstream failures.
    pub async fn generate(&self, kind: ModelKind, prompt: &str) -> Result<Payload> {
        let endpoint = self.backend.endpoint(kind.model_id());
        self.backoff
            .execute(|| self.attempt(kind, prompt, &endpoint))
            .await
    }

    async fn attempt(&self, kind: ModelKind, prompt: &str, endpoint: &str) -> Result<Payload> {
        // permit is held for the whole backend round trip
        let _permit = match &self.inflight {
            Some(sem) => Some(sem.clone().acquire_owned().await.map_err(|_| {
                Error::runtime_with_context(
                    "generation semaphore closed",
                    ErrorContext::new().with_source("generator"),
                )
            })?),
            None => None,
        };

        let body = serde_json::to_vec(&kind.build_request(prompt))?;
        debug!(model = kind.model_id(), endpoint, "invoking backend");
        let resp = self.backend.invoke(endpoint, Bytes::from(body)).await?;

        if !resp.is_success() {
            let text = resp.text();
            error!(status = resp.status, model = kind.model_id(), "backend error: {}", text);
            if resp.status == 401 || resp.status == 403 {
                error!("authentication error; signatures can be rejected when requests reach a different edge location");
            }
            return Err(Error::from_upstream_status(resp.status, text));
        }

        let json: serde_json::Value =
            serde_json::from_slice(&resp.body).map_err(|e| Error::PermanentUpstream {
                status: resp.status,
                message: format!("malformed response body ({}): {}", e, resp.text()),
            })?;
        kind.parse_response(&json)
    }
}
