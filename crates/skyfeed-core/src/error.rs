//! Error types for skyfeed.
//!
//! This module provides [`FeedError`], the single error type that flows
//! through the feed pipeline, and [`ErrorKind`], its classification.
//!
//! # Kinds, wire codes and status
//!
//! Every error belongs to exactly one [`ErrorKind`]. The kind decides the
//! HTTP status and the default XRPC error code. Some kinds accept a code
//! override so a feed algorithm can answer with a more specific code such as
//! `UnknownFeed` or `ExpiredToken`.
//!
//! | `ErrorKind` | Wire code | Status |
//! |---|---|---|
//! | `InvalidRequest` | `InvalidRequest` (overridable) | 400 |
//! | `UnsupportedAlgorithm` | `UnsupportedAlgorithm` | 400 |
//! | `UnsupportedAuthMethod` | `AuthenticationRequired` | 401 |
//! | `BadJwt` | `BadJwt` | 401 |
//! | `AuthenticationRequired` | `AuthenticationRequired` (overridable) | 401 |
//! | `InvalidFeedAlgorithm` | `InternalServerError` | 500 |
//! | `InvalidResponse` | `InvalidResponse` | 500 |
//! | `MethodNotImplemented` | `MethodNotImplemented` | 501 |
//! | `InvalidKey` | `InternalServerError` | 500 |
//! | `Unexpected` | `InternalServerError` | 500 |
//!
//! Errors are translated to the wire exactly once, with
//! [`FeedError::to_envelope`].

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using [`FeedError`].
pub type FeedResult<T> = Result<T, FeedError>;

/// Wire code used for every internal failure.
pub const INTERNAL_SERVER_ERROR_CODE: &str = "InternalServerError";

/// Classification of a [`FeedError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The request parameters are malformed.
    InvalidRequest,
    /// The requested feed is not served by this generator.
    UnsupportedAlgorithm,
    /// The `Authorization` header uses a scheme other than `Bearer`.
    UnsupportedAuthMethod,
    /// The bearer token is not a decodable JWT.
    BadJwt,
    /// A feed algorithm requires an authenticated caller.
    AuthenticationRequired,
    /// A feed algorithm does not fit the configured calling convention.
    InvalidFeedAlgorithm,
    /// A feed algorithm returned a value that is not a valid skeleton.
    InvalidResponse,
    /// The endpoint has no implementation installed.
    MethodNotImplemented,
    /// A feed key was rejected at registration time.
    InvalidKey,
    /// Any failure that is not one of the kinds above.
    Unexpected,
}

impl ErrorKind {
    /// Returns the HTTP status code for this kind.
    #[must_use]
    pub const fn status_code(self) -> StatusCode {
        match self {
            Self::InvalidRequest | Self::UnsupportedAlgorithm => StatusCode::BAD_REQUEST,
            Self::UnsupportedAuthMethod | Self::BadJwt | Self::AuthenticationRequired => {
                StatusCode::UNAUTHORIZED
            }
            Self::MethodNotImplemented => StatusCode::NOT_IMPLEMENTED,
            Self::InvalidFeedAlgorithm
            | Self::InvalidResponse
            | Self::InvalidKey
            | Self::Unexpected => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the wire error code used when no override is given.
    #[must_use]
    pub const fn default_code(self) -> &'static str {
        match self {
            Self::InvalidRequest => "InvalidRequest",
            Self::UnsupportedAlgorithm => "UnsupportedAlgorithm",
            Self::UnsupportedAuthMethod | Self::AuthenticationRequired => {
                "AuthenticationRequired"
            }
            Self::BadJwt => "BadJwt",
            Self::InvalidResponse => "InvalidResponse",
            Self::MethodNotImplemented => "MethodNotImplemented",
            Self::InvalidFeedAlgorithm | Self::InvalidKey | Self::Unexpected => {
                INTERNAL_SERVER_ERROR_CODE
            }
        }
    }

    /// Returns `true` for kinds whose details describe server internals.
    ///
    /// The message of these errors is logged, and only replaced by a generic
    /// text on the wire unless detail exposure is enabled.
    #[must_use]
    pub const fn is_internal(self) -> bool {
        matches!(
            self,
            Self::InvalidFeedAlgorithm | Self::InvalidResponse | Self::InvalidKey | Self::Unexpected
        )
    }
}

/// Failure decoding the caller identity from the `Authorization` header.
///
/// Kept separate from [`FeedError`] because it is memoized per request and
/// therefore has to be `Copy`.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// The header is present but does not use the `Bearer` scheme.
    #[error("Unsupported authorization method")]
    UnsupportedAuthMethod,

    /// The token is not a three-segment JWT with a JSON payload.
    #[error("Invalid JWT format")]
    BadJwt,
}

/// Standard error type for skyfeed.
///
/// # Example
///
/// ```
/// use skyfeed_core::{ErrorKind, FeedError};
///
/// let error = FeedError::invalid_request_with_code("cursor expired", "ExpiredCursor");
/// assert_eq!(error.kind(), ErrorKind::InvalidRequest);
/// assert_eq!(error.error_code(), "ExpiredCursor");
/// assert_eq!(error.status_code().as_u16(), 400);
/// ```
#[derive(Error, Debug)]
pub enum FeedError {
    /// The request parameters are malformed.
    #[error("{message}")]
    InvalidRequest {
        /// Human-readable error message.
        message: String,
        /// Wire code override.
        code: Option<String>,
    },

    /// The requested feed is not served by this generator.
    #[error("{message}")]
    UnsupportedAlgorithm {
        /// Human-readable error message.
        message: String,
    },

    /// The caller identity could not be decoded.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// A feed algorithm requires an authenticated caller.
    #[error("{message}")]
    AuthenticationRequired {
        /// Human-readable error message.
        message: String,
        /// Wire code override.
        code: Option<String>,
    },

    /// A feed algorithm does not fit the configured calling convention.
    #[error("Invalid feed algorithm: {message}")]
    InvalidFeedAlgorithm {
        /// Human-readable error message.
        message: String,
    },

    /// A feed algorithm returned a value that is not a valid skeleton.
    #[error("Invalid response: {message}")]
    InvalidResponse {
        /// Human-readable error message.
        message: String,
    },

    /// The endpoint has no implementation installed.
    #[error("{message}")]
    MethodNotImplemented {
        /// Human-readable error message.
        message: String,
    },

    /// A feed key was rejected at registration time.
    #[error("Invalid feed key {key:?}: {reason}")]
    InvalidKey {
        /// The rejected key.
        key: String,
        /// Which rule the key violates.
        reason: &'static str,
    },

    /// Any failure that is not a recognized domain error.
    #[error("Unexpected error: {source}")]
    Unexpected {
        /// The underlying error (never exposed to callers by default).
        #[source]
        source: anyhow::Error,
    },
}

impl FeedError {
    /// Creates an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
            code: None,
        }
    }

    /// Creates an invalid request error with a custom wire code.
    #[must_use]
    pub fn invalid_request_with_code(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
            code: Some(code.into()),
        }
    }

    /// Creates the error returned for feeds this generator does not serve.
    #[must_use]
    pub fn unsupported_algorithm() -> Self {
        Self::UnsupportedAlgorithm {
            message: "Unsupported algorithm".to_string(),
        }
    }

    /// Creates an authentication required error.
    #[must_use]
    pub fn authentication_required(message: impl Into<String>) -> Self {
        Self::AuthenticationRequired {
            message: message.into(),
            code: None,
        }
    }

    /// Creates an authentication required error with a custom wire code.
    #[must_use]
    pub fn authentication_required_with_code(
        message: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self::AuthenticationRequired {
            message: message.into(),
            code: Some(code.into()),
        }
    }

    /// Creates an invalid feed algorithm error.
    #[must_use]
    pub fn invalid_feed_algorithm(message: impl Into<String>) -> Self {
        Self::InvalidFeedAlgorithm {
            message: message.into(),
        }
    }

    /// Creates an invalid response error.
    #[must_use]
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    /// Creates a method not implemented error.
    #[must_use]
    pub fn method_not_implemented() -> Self {
        Self::MethodNotImplemented {
            message: "Method Not Implemented".to_string(),
        }
    }

    /// Creates an invalid key error.
    #[must_use]
    pub fn invalid_key(key: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidKey {
            key: key.into(),
            reason,
        }
    }

    /// Wraps any error as an unexpected failure.
    pub fn unexpected(source: impl Into<anyhow::Error>) -> Self {
        Self::Unexpected {
            source: source.into(),
        }
    }

    /// Creates an unexpected failure from a plain message.
    #[must_use]
    pub fn unexpected_msg(message: impl std::fmt::Display) -> Self {
        Self::Unexpected {
            source: anyhow::anyhow!("{message}"),
        }
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRequest { .. } => ErrorKind::InvalidRequest,
            Self::UnsupportedAlgorithm { .. } => ErrorKind::UnsupportedAlgorithm,
            Self::Auth(AuthError::UnsupportedAuthMethod) => ErrorKind::UnsupportedAuthMethod,
            Self::Auth(AuthError::BadJwt) => ErrorKind::BadJwt,
            Self::AuthenticationRequired { .. } => ErrorKind::AuthenticationRequired,
            Self::InvalidFeedAlgorithm { .. } => ErrorKind::InvalidFeedAlgorithm,
            Self::InvalidResponse { .. } => ErrorKind::InvalidResponse,
            Self::MethodNotImplemented { .. } => ErrorKind::MethodNotImplemented,
            Self::InvalidKey { .. } => ErrorKind::InvalidKey,
            Self::Unexpected { .. } => ErrorKind::Unexpected,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        self.kind().status_code()
    }

    /// Returns the machine-readable wire code, honoring overrides.
    #[must_use]
    pub fn error_code(&self) -> &str {
        match self {
            Self::InvalidRequest {
                code: Some(code), ..
            }
            | Self::AuthenticationRequired {
                code: Some(code), ..
            } => code,
            _ => self.kind().default_code(),
        }
    }

    /// Returns the message without the kind prefix used by `Display`.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::InvalidRequest { message, .. }
            | Self::UnsupportedAlgorithm { message }
            | Self::AuthenticationRequired { message, .. }
            | Self::InvalidFeedAlgorithm { message }
            | Self::InvalidResponse { message }
            | Self::MethodNotImplemented { message } => message.clone(),
            Self::Auth(error) => error.to_string(),
            Self::InvalidKey { .. } | Self::Unexpected { .. } => self.to_string(),
        }
    }

    /// Converts this error to the XRPC error body.
    ///
    /// When `expose_details` is `false`, internal kinds carry a generic
    /// message instead of their own.
    #[must_use]
    pub fn to_envelope(&self, expose_details: bool) -> ErrorEnvelope {
        let kind = self.kind();
        let message = if kind.is_internal() && !expose_details {
            match kind {
                ErrorKind::InvalidResponse => "Feed algorithm returned an invalid response",
                _ => "Internal server error",
            }
            .to_string()
        } else {
            self.message()
        };

        ErrorEnvelope {
            error: self.error_code().to_string(),
            message,
        }
    }
}

impl From<anyhow::Error> for FeedError {
    fn from(source: anyhow::Error) -> Self {
        Self::Unexpected { source }
    }
}

/// Serializable XRPC error body: `{"error": <code>, "message": <text>}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Machine-readable error code.
    pub error: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorEnvelope {
    /// Creates an envelope from a code and message.
    #[must_use]
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}
