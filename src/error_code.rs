//! Server error codes.
//!
//! The API reports failures as `{"error": {"code", "message", "details"}}`. This module
//! defines the code vocabulary the service documents, with the HTTP status each one usually
//! travels with and whether a caller may reasonably retry it.
//!
//! ## Example
//!
//! ```rust
//! use subconscious::error_code::ErrorCode;
//!
//! let code = ErrorCode::from_code("rate_limited");
//! assert_eq!(code, ErrorCode::RateLimited);
//! assert!(code.retryable());
//! assert_eq!(ErrorCode::from_http_status(404), ErrorCode::NotFound);
//! ```

use std::fmt;

/// Canonical error code reported by the Subconscious API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Malformed request, invalid parameters, or missing required fields
    InvalidRequest,
    /// Invalid, expired, or missing API key
    AuthenticationFailed,
    /// Valid credentials but insufficient permissions
    PermissionDenied,
    /// Run or resource does not exist
    NotFound,
    /// Request rate limit exceeded
    RateLimited,
    /// Internal server error
    InternalError,
    /// Service temporarily unavailable
    ServiceUnavailable,
    /// Upstream gateway timed out
    Timeout,
    /// State conflict, e.g. canceling a run that already finished
    Conflict,
}

impl ErrorCode {
    /// Returns the wire name (e.g. `"invalid_request"`).
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::AuthenticationFailed => "authentication_failed",
            Self::PermissionDenied => "permission_denied",
            Self::NotFound => "not_found",
            Self::RateLimited => "rate_limited",
            Self::InternalError => "internal_error",
            Self::ServiceUnavailable => "service_unavailable",
            Self::Timeout => "timeout",
            Self::Conflict => "conflict",
        }
    }

    /// Whether a caller-side retry may succeed. The client itself never retries.
    #[inline]
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::InternalError | Self::ServiceUnavailable | Self::Timeout
        )
    }

    /// Whether the code belongs to the authentication family (401/403).
    #[inline]
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::AuthenticationFailed | Self::PermissionDenied)
    }

    /// Parses a wire code. Unknown codes map to `InternalError`, which is what the
    /// service reports for anything it does not classify.
    pub fn from_code(code: &str) -> Self {
        Self::parse(code).unwrap_or(Self::InternalError)
    }

    /// Strict variant of [`ErrorCode::from_code`].
    pub fn parse(code: &str) -> Option<Self> {
        let code = match code {
            "invalid_request" => Self::InvalidRequest,
            "authentication_failed" | "authentication" | "invalid_api_key" => {
                Self::AuthenticationFailed
            }
            "permission_denied" => Self::PermissionDenied,
            "not_found" => Self::NotFound,
            "rate_limited" | "rate_limit_exceeded" => Self::RateLimited,
            "internal_error" | "server_error" => Self::InternalError,
            "service_unavailable" => Self::ServiceUnavailable,
            "timeout" => Self::Timeout,
            "conflict" => Self::Conflict,
            _ => return None,
        };
        Some(code)
    }

    /// Maps an HTTP status code to the code the service uses for it.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            400 => Self::InvalidRequest,
            401 => Self::AuthenticationFailed,
            403 => Self::PermissionDenied,
            404 => Self::NotFound,
            409 => Self::Conflict,
            429 => Self::RateLimited,
            503 => Self::ServiceUnavailable,
            504 => Self::Timeout,
            _ => Self::InternalError,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
