//! Route parsing and reply rendering for an HTTP front end.

use super::GatewayResponse;
use crate::drivers::ModelKind;
use crate::types::{with_utf8_charset, TEXT_CONTENT_TYPE};
use crate::{Error, ErrorContext, Result};
use bytes::Bytes;
use percent_encoding::percent_decode_str;
use tracing::error;

pub const INVALID_ROUTE_MESSAGE: &str =
    "Invalid request. Use /image/{prompt}, /text/{prompt} or /gpt/{prompt}.";

pub const CORS_HEADERS: [(&str, &str); 3] = [
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Methods", "GET, OPTIONS"),
    ("Access-Control-Allow-Headers", "Content-Type"),
];

/// Split `/{prefix}/{prompt}` into a model and the percent-decoded prompt.
///
/// An empty prompt is returned as-is; rejecting it is the gateway's job.
pub fn parse_route(path: &str) -> Result<(ModelKind, String)> {
    let path = path.trim().trim_start_matches('/');
    let (prefix, raw) = path.split_once('/').ok_or_else(invalid_route)?;
    let kind = ModelKind::from_route_prefix(prefix).ok_or_else(invalid_route)?;

    let prompt = percent_decode_str(raw).decode_utf8().map_err(|e| {
        Error::validation_with_context(
            "prompt is not valid UTF-8",
            ErrorContext::new()
                .with_field_path("path")
                .with_details(e.to_string())
                .with_source("dispatch"),
        )
    })?;
    Ok((kind, prompt.into_owned()))
}

fn invalid_route() -> Error {
    Error::validation_with_context(
        INVALID_ROUTE_MESSAGE,
        ErrorContext::new().with_field_path("path").with_source("dispatch"),
    )
}

/// A rendered reply: status, headers and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub content_type: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl HttpReply {
    fn new(status: u16, content_type: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            content_type: content_type.into(),
            headers: CORS_HEADERS
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body: body.into(),
        }
    }

    pub fn ok(response: GatewayResponse) -> Self {
        Self::new(
            200,
            with_utf8_charset(&response.content_type),
            response.payload.to_bytes(),
        )
    }

    /// Validation failures echo their message with 400; everything else is a 500.
    pub fn error(err: &Error) -> Self {
        match err {
            Error::Validation { message, .. } => Self::new(400, TEXT_CONTENT_TYPE, message.clone()),
            other => {
                error!("request failed: {}", other);
                Self::new(
                    other.http_status(),
                    TEXT_CONTENT_TYPE,
                    format!("An internal server error occurred: {}", detail(other)),
                )
            }
        }
    }

    pub fn from_result(result: Result<GatewayResponse>) -> Self {
        match result {
            Ok(response) => Self::ok(response),
            Err(e) => Self::error(&e),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

fn detail(err: &Error) -> String {
    match err {
        Error::TransientUpstream { message, .. }
        | Error::PermanentUpstream { message, .. }
        | Error::Transport { message }
        | Error::Serialization { message } => message.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::ResponseSource;
    use crate::types::Payload;

    #[test]
    fn test_parse_route() {
        assert_eq!(
            parse_route("/image/a%20red%20fox").unwrap(),
            (ModelKind::TitanImage, "a red fox".to_string())
        );
        assert_eq!(
            parse_route("/text/hello").unwrap(),
            (ModelKind::ClaudeSonnet, "hello".to_string())
        );
        assert_eq!(
            parse_route("gpt/caf%C3%A9").unwrap(),
            (ModelKind::GptOss, "café".to_string())
        );
        assert_eq!(parse_route("/text/").unwrap(), (ModelKind::ClaudeSonnet, String::new()));
    }

    #[test]
    fn test_parse_route_rejects_unknown() {
        for path in ["/", "/video/x", "/image", "", "/%FF/x"] {
            let err = parse_route(path).unwrap_err();
            assert!(matches!(err, Error::Validation { .. }), "{}", path);
        }
        let err = parse_route("/text/%FF").unwrap_err();
        assert_eq!(err.http_status(), 400);
    }

    #[test]
    fn test_ok_reply() {
        let reply = HttpReply::ok(GatewayResponse {
            payload: Payload::Binary(Bytes::from_static(&[1, 2, 3])),
            content_type: "image/png".into(),
            source: ResponseSource::Cache,
        });
        assert_eq!(reply.status, 200);
        assert_eq!(reply.content_type, "image/png");
        assert_eq!(reply.body.as_ref(), &[1u8, 2, 3]);
        assert_eq!(reply.header("access-control-allow-origin"), Some("*"));
        assert_eq!(reply.header("Access-Control-Allow-Methods"), Some("GET, OPTIONS"));
    }

    #[test]
    fn test_error_replies() {
        let reply = HttpReply::error(&Error::validation("Please provide a valid prompt."));
        assert_eq!(reply.status, 400);
        assert_eq!(reply.body.as_ref(), b"Please provide a valid prompt.");
        assert_eq!(reply.content_type, TEXT_CONTENT_TYPE);

        let reply = HttpReply::error(&Error::TransientUpstream {
            status: 429,
            message: "Too many requests".into(),
        });
        assert_eq!(reply.status, 500);
        assert_eq!(
            reply.body.as_ref(),
            b"An internal server error occurred: Too many requests"
        );
        assert_eq!(reply.header("Access-Control-Allow-Headers"), Some("Content-Type"));
    }
}
