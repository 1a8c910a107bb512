//! Errors surfaced to callers of the API client.

use http::StatusCode;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// A 401 that could not be recovered by refreshing; the session has been cleared.
    #[error("Your session has expired, please sign in again")]
    SessionExpired,

    /// A 403; the session has been cleared.
    #[error("{message}")]
    Forbidden {
        message: String,
        body: Option<Value>,
    },

    /// Any other non-success answer from the backend.
    #[error("{message}")]
    Status {
        status: StatusCode,
        message: String,
        body: Option<Value>,
    },

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to encode request body: {0}")]
    Encode(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Session store error: {0}")]
    Store(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid value for header '{name}': {reason}")]
    InvalidHeader { name: &'static str, reason: String },
}

impl ApiError {
    /// The user-facing message: the backend's `message` when it sent one.
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// HTTP status behind the error, when there was a response.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::SessionExpired => Some(StatusCode::UNAUTHORIZED),
            ApiError::Forbidden { .. } => Some(StatusCode::FORBIDDEN),
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status(),
            _ => None,
        }
    }

    /// True when the client signed the user out while handling this error.
    pub fn signed_out(&self) -> bool {
        matches!(self, ApiError::SessionExpired | ApiError::Forbidden { .. })
    }
}
