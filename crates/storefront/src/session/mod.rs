//! Session handling: the credential every request carries and the
//! coordinator that keeps it fresh.
//!
//! # Architecture
//!
//! - [`CredentialStore`] owns the bearer token and user, persisted under `auth`
//! - [`RefreshGate`] is the `Idle`/`Refreshing` state machine with its FIFO waiter queue
//! - [`SessionCoordinator`] wraps a [`Transport`](crate::transport::Transport):
//!   attaches the token, and on `401 Unauthorized` runs at most one refresh per
//!   expiry episode before replaying every request that hit the expiry
//!
//! # Error Handling
//!
//! - An expired credential is recovered transparently
//! - A failed refresh signs the user out and fails every waiting request
//! - Any other failure is returned to the caller unchanged, and a request is
//!   never retried more than once

mod coordinator;
mod credential;
mod gate;

use std::sync::Arc;
use std::time::Duration;

pub use coordinator::{REFRESH_PATH, SessionCoordinator};
pub use credential::{CREDENTIAL_KEY, Credential, CredentialStore};
pub use gate::{Admission, RefreshGate, RefreshLease, RefreshOutcome, RefreshState, RefreshWaiter};

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

use crate::transport::TransportError;

/// Why a session refresh failed.
///
/// Cloned to every request waiting on the refresh.
#[derive(Debug, Clone, Error)]
pub enum RefreshError {
    /// The service refused the session evidence.
    #[error("Session refresh rejected with HTTP {status}")]
    Rejected { status: StatusCode },

    /// The refresh call never got a response.
    #[error("Session refresh failed: {0}")]
    Transport(Arc<TransportError>),

    /// The refresh response carried no token.
    #[error("Session refresh response did not contain a token")]
    MissingToken,

    /// The refresh did not settle within the configured bound.
    #[error("Session refresh timed out after {0:?}")]
    TimedOut(Duration),

    /// The request leading the refresh was cancelled before it settled.
    #[error("Session refresh was abandoned")]
    Abandoned,

    /// The user signed in or out while the refresh was in flight, so the
    /// refreshed token was discarded.
    #[error("Session changed while it was being refreshed")]
    Superseded,
}

impl RefreshError {
    /// Whether this failure signed the user out.
    ///
    /// An abandoned or superseded refresh leaves the credential as it found it.
    #[must_use]
    pub const fn ends_session(&self) -> bool {
        !matches!(self, Self::Abandoned | Self::Superseded)
    }
}

/// Final outcome of a request that did not succeed.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The service answered with a non-success status.
    #[error("Request failed with HTTP {status}")]
    Status { status: StatusCode, body: Value },

    /// The request never got a response.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The credential expired and could not be refreshed.
    #[error(transparent)]
    Refresh(#[from] RefreshError),
}

impl SessionError {
    /// HTTP status of the final response, if there was one.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The `message` field of an error body, when the service sent one.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Status { body, .. } => body
                .get("message")
                .and_then(Value::as_str)
                .or_else(|| body.as_str()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_message_from_json_body() {
        let error = SessionError::Status {
            status: StatusCode::BAD_REQUEST,
            body: serde_json::json!({ "message": "Address is required" }),
        };
        assert_eq!(error.status(), Some(StatusCode::BAD_REQUEST));
        assert_eq!(error.server_message(), Some("Address is required"));
    }

    #[test]
    fn test_server_message_from_text_body() {
        let error = SessionError::Status {
            status: StatusCode::NOT_FOUND,
            body: Value::String("Not Found".to_string()),
        };
        assert_eq!(error.server_message(), Some("Not Found"));
    }

    #[test]
    fn test_refresh_error_has_no_status() {
        let error = SessionError::from(RefreshError::Abandoned);
        assert_eq!(error.status(), None);
        assert_eq!(error.server_message(), None);
    }

    #[test]
    fn test_only_real_failures_end_the_session() {
        assert!(RefreshError::MissingToken.ends_session());
        assert!(RefreshError::TimedOut(Duration::from_secs(1)).ends_session());
        assert!(!RefreshError::Abandoned.ends_session());
        assert!(!RefreshError::Superseded.ends_session());
    }
}
