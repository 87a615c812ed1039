//! Error types used throughout the client

use thiserror::Error;

use crate::impl_wire_enum_conversions;

/// Categories of errors, used for retry decisions and log labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Caller supplied an invalid argument - never retried
    Validation,
    /// The HTTP exchange itself failed - retryable
    Transport,
    /// 401/403 or a logical token-endpoint failure
    Authentication,
    /// 429 - retry with backoff
    RateLimit,
    /// 5xx - retryable
    Server,
    /// Other non-2xx statuses - non-retryable
    Client,
    /// Malformed response body or rule element
    Decode,
    /// Configuration problems - non-retryable
    Config,
    /// Caller cancelled the operation
    Cancelled,
    /// 2xx response whose envelope reported `success=false`
    Unsuccessful,
}

impl_wire_enum_conversions!(ErrorCategory {
    Validation => "validation",
    Transport => "transport",
    Authentication => "authentication",
    RateLimit => "rate_limit",
    Server => "server",
    Client => "client",
    Decode => "decode",
    Config => "config",
    Cancelled => "cancelled",
    Unsuccessful => "unsuccessful",
});

/// Main error type for the Armis client
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArmisError {
    /// Bad input caught before any request is sent
    #[error("Validation error: {0}")]
    Validation(String),

    /// Connection, TLS or timeout failure with no HTTP status
    #[error("Transport error: {0}")]
    Transport(String),

    /// Any response outside the 2xx range. The body is kept verbatim.
    #[error("API error: status {status}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body as received
        body: Vec<u8>,
    },

    /// Token exchange returned no usable token
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Token expiry that is not valid RFC3339
    #[error("Time parse error: {0}")]
    TimeParse(String),

    /// 2xx body that is not a valid envelope
    #[error("Decode error: {0}")]
    Decode(String),

    /// Missing or invalid settings
    #[error("Configuration error: {0}")]
    Config(String),

    /// The caller's cancellation token fired first
    #[error("Operation cancelled")]
    Cancelled,

    /// 2xx response with `success=false`
    #[error("Response envelope reported success=false")]
    Unsuccessful,
}

impl ArmisError {
    /// Build an [`ArmisError::Api`] from a status code and raw body.
    pub fn api(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self::Api { status, body: body.into() }
    }

    /// Get the error category for this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) => ErrorCategory::Validation,
            Self::Transport(_) => ErrorCategory::Transport,
            Self::Api { status, .. } => match *status {
                401 | 403 => ErrorCategory::Authentication,
                429 => ErrorCategory::RateLimit,
                500..=599 => ErrorCategory::Server,
                _ => ErrorCategory::Client,
            },
            Self::Auth(_) => ErrorCategory::Authentication,
            Self::TimeParse(_) | Self::Decode(_) => ErrorCategory::Decode,
            Self::Config(_) => ErrorCategory::Config,
            Self::Cancelled => ErrorCategory::Cancelled,
            Self::Unsuccessful => ErrorCategory::Unsuccessful,
        }
    }

    /// Whether a bounded retry with backoff may succeed.
    ///
    /// Only transport failures, 429 and 5xx qualify. A 401 is handled by
    /// re-authentication instead, see [`ArmisError::requires_reauth`].
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Transport | ErrorCategory::RateLimit | ErrorCategory::Server
        )
    }

    /// Whether the caller should discard its token, authenticate again and
    /// retry once.
    pub fn requires_reauth(&self) -> bool {
        matches!(self, Self::Api { status: 401, .. })
    }

    /// Status code of an [`ArmisError::Api`], if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Raw response body of an [`ArmisError::Api`], if any.
    pub fn body(&self) -> Option<&[u8]> {
        match self {
            Self::Api { body, .. } => Some(body),
            _ => None,
        }
    }
}

/// Result type alias for Armis operations
pub type Result<T> = std::result::Result<T, ArmisError>;
