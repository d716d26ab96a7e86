use crate::error_code::ErrorCode;
use crate::transport::TransportError;
use std::time::Duration;
use thiserror::Error;

/// Structured error context for client-side failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field path that caused the error (e.g., "input.tools[0].defaults.session_id")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected shape, offending value)
    pub details: Option<String>,
    /// Source of the error (e.g., "tool_normalizer", "client_builder")
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

/// Unified error type for the Subconscious client.
///
/// Three different "timeout" signals exist and are kept apart:
/// - [`Error::Connection`] wrapping [`TransportError::Timeout`] or
///   [`TransportError::IdleTimeout`]: a request timed out or a stream went silent.
/// - [`Error::Timeout`]: `wait` used up its attempt budget while the run was still active.
/// - [`crate::RunStatus::TimedOut`]: the server reports the run itself timed out (not an error).
#[derive(Debug, Error)]
pub enum Error {
    /// Bad or missing API key (HTTP 401/403). Never retried by the client.
    #[error("Authentication error: HTTP {status}: {message}")]
    Authentication { status: u16, message: String },

    /// HTTP 429. The client does not retry; `retry_after` carries the server hint if any.
    #[error("Rate limit exceeded: {message}")]
    RateLimit {
        message: String,
        retry_after: Option<Duration>,
    },

    /// Malformed request detected client-side before any network call.
    #[error("Validation error: {message}{}", format_context(.context))]
    Validation {
        message: String,
        context: ErrorContext,
    },

    /// Unknown run id or resource (HTTP 404).
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// `wait` exhausted its attempt budget while the run was still non-terminal.
    #[error("Polling run {run_id} exceeded max attempts ({attempts})")]
    Timeout { run_id: String, attempts: u32 },

    /// Network-level failure: connect, DNS, TLS, body read or request timeout.
    #[error("Connection error: {0}")]
    Connection(#[from] TransportError),

    /// Any other API failure, carrying the server-provided code and message.
    #[error("API error: HTTP {status} ({code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A caller-supplied cancellation token fired while waiting.
    #[error("Waiting for run {run_id} was cancelled")]
    Cancelled { run_id: String },
}

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

impl Error {
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

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. } | Error::Validation { context, .. } => {
                Some(context)
            }
            _ => None,
        }
    }

    /// HTTP status for errors that came back from the server.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Authentication { status, .. } | Error::Api { status, .. } => Some(*status),
            Error::RateLimit { .. } => Some(429),
            Error::NotFound { .. } => Some(404),
            _ => None,
        }
    }

    /// Server error code for errors that came back from the server.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Error::Authentication { status, .. } => Some(ErrorCode::from_http_status(*status)),
            Error::RateLimit { .. } => Some(ErrorCode::RateLimited),
            Error::NotFound { .. } => Some(ErrorCode::NotFound),
            Error::Api { status, code, .. } => Some(
                ErrorCode::parse(code).unwrap_or_else(|| ErrorCode::from_http_status(*status)),
            ),
            _ => None,
        }
    }

    /// Retry hint supplied with a rate-limit response.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Error::RateLimit { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Whether the caller may reasonably retry. The client never does so itself.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::RateLimit { .. } | Error::Connection(_) => true,
            Error::Api { code, status, .. } => match ErrorCode::parse(code) {
                Some(code) => code.retryable(),
                None => *status >= 500,
            },
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    pub fn is_auth_error(&self) -> bool {
        matches!(self, Error::Authentication { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_display_includes_context() {
        let err = Error::validation_with_context(
            "defaulted parameter is not declared",
            ErrorContext::new()
                .with_field_path("input.tools[0].defaults.session_id")
                .with_source("tool_normalizer"),
        );
        let text = err.to_string();
        assert!(text.starts_with("Validation error: defaulted parameter"));
        assert!(text.contains("field: input.tools[0].defaults.session_id"));
        assert!(text.contains("source: tool_normalizer"));
        assert_eq!(
            err.context().and_then(|c| c.source.as_deref()),
            Some("tool_normalizer")
        );
    }

    #[test]
    fn rate_limit_exposes_retry_hint() {
        let err = Error::RateLimit {
            message: "slow down".into(),
            retry_after: Some(Duration::from_secs(7)),
        };
        assert_eq!(err.retry_after(), Some(Duration::from_secs(7)));
        assert_eq!(err.status(), Some(429));
        assert_eq!(err.code(), Some(ErrorCode::RateLimited));
        assert!(err.is_retryable());
    }

    #[test]
    fn api_error_classification() {
        let err = Error::Api {
            status: 503,
            code: "service_unavailable".into(),
            message: "try later".into(),
            details: None,
        };
        assert!(err.is_retryable());
        assert_eq!(err.code(), Some(ErrorCode::ServiceUnavailable));

        let err = Error::Api {
            status: 400,
            code: "invalid_request".into(),
            message: "bad engine".into(),
            details: None,
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn unrecognized_code_is_classified_by_status() {
        let err = Error::Api {
            status: 400,
            code: "engine_not_found".into(),
            message: "no such engine".into(),
            details: None,
        };
        assert!(!err.is_retryable());
        assert_eq!(err.code(), Some(ErrorCode::InvalidRequest));

        let err = Error::Api {
            status: 502,
            code: "upstream_gone".into(),
            message: "bad gateway".into(),
            details: None,
        };
        assert!(err.is_retryable());
        assert_eq!(err.code(), Some(ErrorCode::InternalError));
    }

    #[test]
    fn wait_timeout_is_not_a_transport_timeout() {
        let err = Error::Timeout {
            run_id: "run_1".into(),
            attempts: 3,
        };
        assert!(!err.is_retryable());
        assert!(err.status().is_none());
        assert_eq!(err.to_string(), "Polling run run_1 exceeded max attempts (3)");
    }
}
