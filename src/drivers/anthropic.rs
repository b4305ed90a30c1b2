//! Claude (Anthropic Messages on Bedrock) driver.
//!
//! Differences from the chat-completions shape:
//! - `anthropic_version` is required in the body.
//! - Response text lives at `content[0].text` instead of `choices[0].message.content`.

use serde_json::Value;

use super::{unexpected_shape, user_text_message};
use crate::types::Payload;
use crate::Result;

pub const MODEL_ID: &str = "anthropic.claude-3-5-sonnet-20241022-v2:0";

const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";
const DEFAULT_MAX_TOKENS: u32 = 2048;

pub fn build_request(prompt: &str) -> Value {
    serde_json::json!({
        "anthropic_version": ANTHROPIC_VERSION,
        "max_tokens": DEFAULT_MAX_TOKENS,
        "temperature": 0.7,
        "messages": user_text_message(prompt),
    })
}

pub fn parse_response(body: &Value) -> Result<Payload> {
    let text = body
        .pointer("/content/0/text")
        .and_then(|v| v.as_str())
        .ok_or_else(|| unexpected_shape("Claude", body))?;
    Ok(Payload::Text(text.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_build_request() {
        let req = build_request("a cat");
        assert_eq!(req["anthropic_version"], ANTHROPIC_VERSION);
        assert_eq!(req["messages"][0]["content"][0]["type"], "text");
        assert_eq!(req["messages"][0]["content"][0]["text"], "a cat");
    }

    #[test]
    fn test_parse_response() {
        let body = serde_json::json!({
            "content": [{ "type": "text", "text": "  meow\n" }],
            "stop_reason": "end_turn"
        });
        assert_eq!(parse_response(&body).unwrap(), Payload::Text("meow".into()));
    }

    #[test]
    fn test_unexpected_shape_carries_body() {
        let body = serde_json::json!({ "content": [] });
        let err = parse_response(&body).unwrap_err();
        assert!(matches!(err, Error::PermanentUpstream { status: 200, .. }));
        assert!(err.to_string().contains("Unexpected Claude response format"));
    }
}
