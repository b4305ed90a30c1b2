//! 模型驱动层 — 为每个后端模型构造请求体并解析响应
//!
//! Model drivers: request shaping and response extraction per backend model.
//!
//! Each supported model is a [`ModelKind`] variant. The variant selects the
//! model id used in the invoke endpoint, the JSON body sent to the backend and
//! the way a generated [`Payload`] is pulled out of the response. The gateway
//! itself never looks inside request or response bodies.

pub mod anthropic;
pub mod gpt_oss;
pub mod titan;

use crate::types::{Payload, PayloadKind};
use crate::{Error, ErrorContext, Result};
use serde_json::Value;

/// Models the gateway can front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
    TitanImage,
    GptOss,
    ClaudeSonnet,
}

impl ModelKind {
    pub const ALL: [ModelKind; 3] = [ModelKind::TitanImage, ModelKind::GptOss, ModelKind::ClaudeSonnet];

    /// Backend model identifier.
    pub fn model_id(&self) -> &'static str {
        match self {
            ModelKind::TitanImage => titan::MODEL_ID,
            ModelKind::GptOss => gpt_oss::MODEL_ID,
            ModelKind::ClaudeSonnet => anthropic::MODEL_ID,
        }
    }

    pub fn payload_kind(&self) -> PayloadKind {
        match self {
            ModelKind::TitanImage => PayloadKind::Binary,
            ModelKind::GptOss | ModelKind::ClaudeSonnet => PayloadKind::Text,
        }
    }

    /// Key-space prefix shared by the cache and the coalescer.
    pub fn namespace(&self) -> &'static str {
        match self {
            ModelKind::TitanImage => "titan-image",
            ModelKind::GptOss => "gpt-oss",
            ModelKind::ClaudeSonnet => "claude-sonnet",
        }
    }

    /// Map a route prefix (`image`, `text`, `gpt`) to a model.
    pub fn from_route_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "image" => Some(ModelKind::TitanImage),
            "text" | "claude" => Some(ModelKind::ClaudeSonnet),
            "gpt" => Some(ModelKind::GptOss),
            _ => None,
        }
    }

    pub fn build_request(&self, prompt: &str) -> Value {
        match self {
            ModelKind::TitanImage => titan::build_request(prompt),
            ModelKind::GptOss => gpt_oss::build_request(prompt),
            ModelKind::ClaudeSonnet => anthropic::build_request(prompt),
        }
    }

    pub fn parse_response(&self, body: &Value) -> Result<Payload> {
        match self {
            ModelKind::TitanImage => titan::parse_response(body),
            ModelKind::GptOss => gpt_oss::parse_response(body),
            ModelKind::ClaudeSonnet => anthropic::parse_response(body),
        }
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.namespace())
    }
}

impl std::str::FromStr for ModelKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ModelKind::from_route_prefix(s)
            .or_else(|| ModelKind::ALL.into_iter().find(|k| k.namespace() == s))
            .ok_or_else(|| {
                Error::validation_with_context(
                    format!("Unsupported model type: {}", s),
                    ErrorContext::new()
                        .with_field_path("model_kind")
                        .with_source("drivers"),
                )
            })
    }
}

/// Response did not have the shape the driver expects.
pub(crate) fn unexpected_shape(what: &str, body: &Value) -> Error {
    Error::PermanentUpstream {
        status: 200,
        message: format!("Unexpected {} response format: {}", what, body),
    }
}

/// Shared `messages` block used by the chat-style models.
pub(crate) fn user_text_message(prompt: &str) -> Value {
    serde_json::json!([{
        "role": "user",
        "content": [{ "type": "text", "text": prompt }],
    }])
}
