//! Titan image generator driver.
//!
//! Request: `TEXT_IMAGE` task producing one 1024x1024 image with a random seed.
//! Response: `{"images": ["<base64 png>"]}`.

use base64::Engine as _;
use bytes::Bytes;
use serde_json::Value;
use uuid::Uuid;

use super::unexpected_shape;
use crate::types::Payload;
use crate::Result;

pub const MODEL_ID: &str = "amazon.titan-image-generator-v2:0";

const MAX_SEED: u128 = 2_147_483_647;

fn random_seed() -> u32 {
    (Uuid::new_v4().as_u128() % MAX_SEED) as u32
}

pub fn build_request(prompt: &str) -> Value {
    serde_json::json!({
        "taskType": "TEXT_IMAGE",
        "textToImageParams": { "text": prompt },
        "imageGenerationConfig": {
            "numberOfImages": 1,
            "quality": "standard",
            "height": 1024,
            "width": 1024,
            "cfgScale": 8.0,
            "seed": random_seed(),
        },
    })
}

pub fn parse_response(body: &Value) -> Result<Payload> {
    let encoded = body
        .pointer("/images/0")
        .and_then(|v| v.as_str())
        .ok_or_else(|| unexpected_shape("image", body))?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|_| unexpected_shape("image", body))?;
    Ok(Payload::Binary(Bytes::from(bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_build_request() {
        let req = build_request("sunset over mountains");
        assert_eq!(req["taskType"], "TEXT_IMAGE");
        assert_eq!(req["textToImageParams"]["text"], "sunset over mountains");
        assert_eq!(req["imageGenerationConfig"]["numberOfImages"], 1);
        let seed = req["imageGenerationConfig"]["seed"].as_u64().unwrap();
        assert!(seed < MAX_SEED as u64);
    }

    #[test]
    fn test_parse_response_decodes_base64() {
        let png = [0x89u8, b'P', b'N', b'G', 0, 0, 0xff];
        let encoded = base64::engine::general_purpose::STANDARD.encode(png);
        let body = serde_json::json!({ "images": [encoded] });
        assert_eq!(
            parse_response(&body).unwrap(),
            Payload::Binary(Bytes::copy_from_slice(&png))
        );
    }

    #[test]
    fn test_parse_response_rejects_unexpected_shape() {
        for body in [
            serde_json::json!({ "images": [] }),
            serde_json::json!({ "error": "nope" }),
            serde_json::json!({ "images": ["***not base64***"] }),
        ] {
            let err = parse_response(&body).unwrap_err();
            assert!(matches!(err, Error::PermanentUpstream { .. }));
            assert!(err.to_string().contains("Unexpected image response format"));
        }
    }
}
