//! Generated payloads and their content types.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

pub const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";
pub const DEFAULT_BINARY_CONTENT_TYPE: &str = "image/png";

/// How a payload is encoded at rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadKind {
    Text,
    Binary,
}

impl PayloadKind {
    /// Best guess for objects stored without an explicit kind.
    pub fn from_content_type(content_type: &str) -> Self {
        if is_utf8_text(content_type) {
            PayloadKind::Text
        } else {
            PayloadKind::Binary
        }
    }
}

/// Value produced by a generation and served to clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Binary(Bytes),
}

impl Payload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            Payload::Text(_) => PayloadKind::Text,
            Payload::Binary(_) => PayloadKind::Binary,
        }
    }

    /// Wire bytes: UTF-8 for text, unchanged for binary.
    pub fn to_bytes(&self) -> Bytes {
        match self {
            Payload::Text(s) => Bytes::copy_from_slice(s.as_bytes()),
            Payload::Binary(b) => b.clone(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(s) => Some(s),
            Payload::Binary(_) => None,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Payload::Text(s) => s.as_bytes(),
            Payload::Binary(b) => b,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// True when a stored content type declares UTF-8 text.
pub fn is_utf8_text(content_type: &str) -> bool {
    let lower = content_type.to_ascii_lowercase();
    lower.starts_with("text/")
        && lower
            .split(';')
            .skip(1)
            .any(|p| p.trim().replace(' ', "") == "charset=utf-8")
}

/// Append `charset=utf-8` to `text/*` types that do not carry one.
pub fn with_utf8_charset(content_type: &str) -> String {
    if content_type.starts_with("text/") && !content_type.contains("charset") {
        format!("{}; charset=utf-8", content_type)
    } else {
        content_type.to_string()
    }
}
