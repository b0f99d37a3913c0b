//! Error taxonomy for API calls.
//!
//! Every failed call resolves to exactly one [`ErrorKind`]. [`ApiError`]
//! carries the kind together with the server's message, the HTTP status
//! (when there was one) and any field-level validation errors.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Closed classification of a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    NoConnection,
    Timeout,
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    ValidationError,
    ServerError,
    ConnectionError,
    Cancelled,
    Unknown,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 11] = [
        ErrorKind::NoConnection,
        ErrorKind::Timeout,
        ErrorKind::BadRequest,
        ErrorKind::Unauthorized,
        ErrorKind::Forbidden,
        ErrorKind::NotFound,
        ErrorKind::ValidationError,
        ErrorKind::ServerError,
        ErrorKind::ConnectionError,
        ErrorKind::Cancelled,
        ErrorKind::Unknown,
    ];

    /// Maps an HTTP status code to a kind. Returns `None` for 2xx.
    ///
    /// Everything at or above 500 is a server error, and so is any other
    /// unexpected non-2xx code (1xx, 3xx, unlisted 4xx).
    pub fn from_status(status: u16) -> Option<ErrorKind> {
        match status {
            200..=299 => None,
            400 => Some(ErrorKind::BadRequest),
            401 => Some(ErrorKind::Unauthorized),
            403 => Some(ErrorKind::Forbidden),
            404 => Some(ErrorKind::NotFound),
            422 => Some(ErrorKind::ValidationError),
            s if s >= 500 => Some(ErrorKind::ServerError),
            _ => Some(ErrorKind::ServerError),
        }
    }

    /// Generic message safe to show in a UI, independent of what the server said.
    pub fn user_message(self) -> &'static str {
        match self {
            ErrorKind::NoConnection => {
                "No internet connection. Please check your network settings."
            }
            ErrorKind::Timeout => "The request timed out. Please try again.",
            ErrorKind::BadRequest => "Invalid request. Please check your input.",
            ErrorKind::Unauthorized => "Your session has expired. Please log in again.",
            ErrorKind::Forbidden => "You don't have permission to perform this action.",
            ErrorKind::NotFound => "The requested resource was not found.",
            ErrorKind::ValidationError => "Please check your input and try again.",
            ErrorKind::ServerError => "Server error. Please try again later.",
            ErrorKind::ConnectionError => "Unable to connect to the server. Please try again.",
            ErrorKind::Cancelled => "The request was cancelled.",
            ErrorKind::Unknown => "An unexpected error occurred. Please try again.",
        }
    }

    /// Transient failures that may succeed when re-attempted.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::Timeout
                | ErrorKind::ConnectionError
                | ErrorKind::ServerError
                | ErrorKind::NoConnection
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NoConnection => "no-connection",
            ErrorKind::Timeout => "timeout",
            ErrorKind::BadRequest => "bad-request",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotFound => "not-found",
            ErrorKind::ValidationError => "validation-error",
            ErrorKind::ServerError => "server-error",
            ErrorKind::ConnectionError => "connection-error",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified failure of an API call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    pub message: String,
    pub kind: ErrorKind,
    pub status_code: Option<u16>,
    pub field_errors: BTreeMap<String, Vec<String>>,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
            status_code: None,
            field_errors: BTreeMap::new(),
        }
    }

    /// Error whose message is the kind's generic user message.
    pub fn from_kind(kind: ErrorKind) -> Self {
        Self::new(kind, kind.user_message())
    }

    pub fn no_connection() -> Self {
        Self::from_kind(ErrorKind::NoConnection)
    }

    pub fn cancelled() -> Self {
        Self::from_kind(ErrorKind::Cancelled)
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }

    pub fn with_field_errors(mut self, field_errors: BTreeMap<String, Vec<String>>) -> Self {
        self.field_errors = field_errors;
        self
    }

    /// Raw message, usually the one the server sent.
    pub fn error_message(&self) -> &str {
        &self.message
    }

    pub fn user_message(&self) -> &'static str {
        self.kind.user_message()
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    pub fn is_client_error(&self) -> bool {
        matches!(self.status_code, Some(s) if (400..500).contains(&s))
    }

    pub fn is_server_error(&self) -> bool {
        matches!(self.status_code, Some(s) if s >= 500)
    }

    /// First validation message recorded for `field`, if any.
    pub fn field_error(&self, field: &str) -> Option<&str> {
        self.field_errors
            .get(field)
            .and_then(|messages| messages.first())
            .map(String::as_str)
    }
}

/// Failure of a single executor call.
///
/// Classified failures and payload decoding failures are kept apart: a decode
/// error means the caller's expected shape does not match the payload, not
/// that the network misbehaved.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("failed to decode response payload: {0}")]
    Decode(#[source] anyhow::Error),
}

impl RequestError {
    /// The classified error, if this is not a decode failure.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            RequestError::Api(e) => Some(e),
            RequestError::Decode(_) => None,
        }
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        self.api_error().map(|e| e.kind)
    }
}

/// Invalid configuration values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("base URL must not be empty")]
    EmptyBaseUrl,

    #[error("invalid header {name:?}: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),
}
