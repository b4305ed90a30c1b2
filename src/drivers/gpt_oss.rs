//! GPT-OSS chat completions driver.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::{unexpected_shape, user_text_message};
use crate::types::Payload;
use crate::Result;

pub const MODEL_ID: &str = "openai.gpt-oss-120b-1:0";

// Reasoning traces can span lines, hence `(?s)`.
static REASONING_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<reasoning>.*?</reasoning>").expect("valid reasoning pattern"));

pub fn build_request(prompt: &str) -> Value {
    serde_json::json!({
        "max_tokens": 2048,
        "temperature": 0.7,
        "messages": user_text_message(prompt),
    })
}

pub fn parse_response(body: &Value) -> Result<Payload> {
    let content = body
        .pointer("/choices/0/message/content")
        .and_then(|v| v.as_str())
        .ok_or_else(|| unexpected_shape("GPT", body))?;
    let cleaned = REASONING_BLOCK.replace_all(content, "");
    Ok(Payload::Text(cleaned.trim().to_string()))
}
