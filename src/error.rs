use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field or configuration key that caused the error (e.g., "config.fingerprint_length")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., the offending value)
    pub details: Option<String>,
    /// Component that raised the error (e.g., "cache_store", "coalescer")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Coarse classification used at the transport boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Upstream,
    Store,
    Internal,
}

/// Unified error type for the gateway.
///
/// Every variant is cheap to clone: a single failed generation is handed to
/// every caller that was coalesced onto it, so each of them must observe the
/// same kind, status and message.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    #[error("Validation error: {message}{}", format_context(.context))]
    Validation {
        message: String,
        context: ErrorContext,
    },

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Upstream error (transient): HTTP {status}: {message}")]
    TransientUpstream { status: u16, message: String },

    #[error("Upstream error: HTTP {status}: {message}")]
    PermanentUpstream { status: u16, message: String },

    #[error("Network transport error: {message}")]
    Transport { message: String },

    #[error("Cache store error: {message}{}", format_context(.context))]
    Store {
        message: String,
        context: ErrorContext,
    },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Runtime error: {message}{}", format_context(.context))]
    Runtime {
        message: String,
        context: ErrorContext,
    },
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

/// Upstream statuses that are retried by default.
///
/// 401 and 403 are included on purpose: request signatures computed on one
/// edge location are occasionally rejected by another replica and succeed
/// when sent again.
pub const RETRYABLE_STATUSES: [u16; 3] = [429, 401, 403];

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation {
            message: msg.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a new validation error with structured context
    pub fn validation_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Validation {
            message: msg.into(),
            context,
        }
    }

    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    /// Create a new store error with structured context
    pub fn store_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Store {
            message: msg.into(),
            context,
        }
    }

    /// Create a new runtime error with structured context
    pub fn runtime_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Runtime {
            message: msg.into(),
            context,
        }
    }

    /// Classify a non-success backend status.
    pub fn from_upstream_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        if RETRYABLE_STATUSES.contains(&status) {
            Error::TransientUpstream { status, message }
        } else {
            Error::PermanentUpstream { status, message }
        }
    }

    /// Status code carried by upstream failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::TransientUpstream { status, .. } | Error::PermanentUpstream { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    /// Default retry predicate: only the classified transient statuses.
    pub fn is_retryable(&self) -> bool {
        self.status()
            .map(|s| RETRYABLE_STATUSES.contains(&s))
            .unwrap_or(false)
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation { .. } => ErrorKind::Validation,
            Error::TransientUpstream { .. }
            | Error::PermanentUpstream { .. }
            | Error::Transport { .. } => ErrorKind::Upstream,
            Error::Store { .. } => ErrorKind::Store,
            Error::Configuration { .. } | Error::Serialization { .. } | Error::Runtime { .. } => {
                ErrorKind::Internal
            }
        }
    }

    /// HTTP status a dispatcher should answer with.
    pub fn http_status(&self) -> u16 {
        match self.kind() {
            ErrorKind::Validation => 400,
            _ => 500,
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Validation { context, .. }
            | Error::Configuration { context, .. }
            | Error::Store { context, .. }
            | Error::Runtime { context, .. } => Some(context),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization {
            message: e.to_string(),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Transport {
            message: e.to_string(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::store_with_context(e.to_string(), ErrorContext::new().with_source("io"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_classification() {
        for status in [429, 401, 403] {
            let err = Error::from_upstream_status(status, "boom");
            assert!(matches!(err, Error::TransientUpstream { .. }));
            assert!(err.is_retryable());
        }
        for status in [400, 404, 500, 502, 503] {
            let err = Error::from_upstream_status(status, "boom");
            assert!(matches!(err, Error::PermanentUpstream { .. }));
            assert!(!err.is_retryable());
            assert_eq!(err.status(), Some(status));
        }
    }

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(Error::validation("empty").http_status(), 400);
        assert_eq!(Error::from_upstream_status(429, "slow down").http_status(), 500);
        assert_eq!(
            Error::store_with_context("down", ErrorContext::new()).http_status(),
            500
        );
    }

    #[test]
    fn test_context_display() {
        let err = Error::validation_with_context(
            "Please provide a valid prompt.",
            ErrorContext::new()
                .with_field_path("request.key")
                .with_source("gateway"),
        );
        let text = err.to_string();
        assert!(text.contains("Please provide a valid prompt."));
        assert!(text.contains("field: request.key"));
        assert!(text.contains("source: gateway"));
    }

    #[test]
    fn test_transport_errors_are_not_retryable() {
        let err = Error::Transport {
            message: "connection reset".into(),
        };
        assert!(!err.is_retryable());
        assert_eq!(err.kind(), ErrorKind::Upstream);
    }
}
