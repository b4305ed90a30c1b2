use super::{Backend, BackendResponse};
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::env;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
pub struct HttpBackendConfig {
    pub region: String,
    /// Replaces `https://bedrock-runtime.{region}.amazonaws.com` (proxies, tests).
    pub base_url: Option<String>,
    /// Sent as a bearer token when present.
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for HttpBackendConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            base_url: None,
            api_key: None,
            timeout: Duration::from_secs(30),
        }
    }
}

impl HttpBackendConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `AWS_REGION`, `GATEWAY_BASE_URL`,
    /// `BEDROCK_API_KEY` and `GATEWAY_HTTP_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(region) = env::var("AWS_REGION") {
            cfg.region = region;
        }
        cfg.base_url = env::var("GATEWAY_BASE_URL").ok();
        cfg.api_key = env::var("BEDROCK_API_KEY").ok();
        if let Some(secs) = env::var("GATEWAY_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            cfg.timeout = Duration::from_secs(secs);
        }
        cfg
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// reqwest-based [`Backend`].
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpBackend {
    pub fn new(config: HttpBackendConfig) -> Result<Self> {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| format!("https://bedrock-runtime.{}.amazonaws.com", config.region));
        Url::parse(&base_url).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid backend base URL: {}", e),
                ErrorContext::new()
                    .with_field_path("base_url")
                    .with_details(base_url.clone())
                    .with_source("http_backend"),
            )
        })?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .build()
            .map_err(|e| {
                Error::configuration_with_context(
                    format!("failed to build HTTP client: {}", e),
                    ErrorContext::new().with_source("http_backend"),
                )
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Backend for HttpBackend {
    fn endpoint(&self, model_id: &str) -> String {
        format!("{}/model/{}/invoke", self.base_url, model_id)
    }

    async fn invoke(&self, endpoint: &str, body: Bytes) -> Result<BackendResponse> {
        let mut req = self
            .client
            .post(endpoint)
            .header("content-type", "application/json")
            .header("accept", "application/json")
            .body(body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await?;
        Ok(BackendResponse { status, body })
    }
}
