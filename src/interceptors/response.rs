use http::StatusCode;

use crate::auth::SignOutReason;
use crate::error::ApiError;
use crate::utils::value::{backend_message, body_value};

/// Whether a request has already been replayed after a refresh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RetryState {
    #[default]
    NotRetried,
    RetriedOnce,
}

/// What the client must do with a response.
#[derive(Debug)]
pub enum Outcome {
    /// Hand the response to the caller.
    Pass,
    /// Refresh the token and replay the request once.
    Retry,
    /// Clear the session, then fail the caller with the given error.
    ForceSignOut(SignOutReason, ApiError),
    /// Fail the caller; the session is left alone.
    Fail(ApiError),
}

/// Classifies a response.
///
/// `recover_auth` is false for requests that must not trigger refresh or
/// sign-out (login, logout); their 401/403 fail like any other status.
pub fn classify(status: StatusCode, body: &[u8], retry: RetryState, recover_auth: bool) -> Outcome {
    if status.is_success() {
        return Outcome::Pass;
    }

    match status {
        StatusCode::UNAUTHORIZED if recover_auth => match retry {
            RetryState::NotRetried => Outcome::Retry,
            // A fresh token was rejected too; refreshing again would loop.
            RetryState::RetriedOnce => {
                Outcome::ForceSignOut(SignOutReason::RefreshRejected, ApiError::SessionExpired)
            }
        },
        StatusCode::FORBIDDEN if recover_auth => Outcome::ForceSignOut(
            SignOutReason::Forbidden,
            ApiError::Forbidden {
                message: message_for(status, body),
                body: body_value(body),
            },
        ),
        _ => Outcome::Fail(ApiError::Status {
            status,
            message: message_for(status, body),
            body: body_value(body),
        }),
    }
}

fn message_for(status: StatusCode, body: &[u8]) -> String {
    backend_message(body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .map(str::to_string)
            .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()))
    })
}
