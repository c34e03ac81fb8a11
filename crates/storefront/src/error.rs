//! Unified error handling for the storefront client.
//!
//! Every public operation returns `Result<T, ClientError>`; module errors
//! convert into it with `?`.

use reqwest::StatusCode;
use thiserror::Error;

use feastly_core::{CheckoutError, EmailError};

use crate::config::ConfigError;
use crate::session::SessionError;
use crate::transport::TransportError;

/// Client-level error type.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Request failed after session handling (final status, transport or refresh failure).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Transport could not be built or reached.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The cart cannot be checked out as it stands.
    #[error("Checkout rejected: {0}")]
    Checkout(#[from] CheckoutError),

    /// Response body did not have the expected shape.
    #[error("Unexpected response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Caller supplied an invalid email address.
    #[error("Invalid email: {0}")]
    Email(#[from] EmailError),

    /// Environment configuration is missing or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The operation requires a signed-in user.
    #[error("Not signed in")]
    NotAuthenticated,
}

impl ClientError {
    /// HTTP status of the final response, if the service answered.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Session(e) => e.status(),
            _ => None,
        }
    }

    /// Human-readable message sent by the service, if any.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Session(e) => e.server_message(),
            _ => None,
        }
    }

    /// Whether the failure ended the session.
    #[must_use]
    pub const fn is_signed_out(&self) -> bool {
        match self {
            Self::Session(SessionError::Refresh(e)) => e.ends_session(),
            Self::NotAuthenticated => true,
            _ => false,
        }
    }
}

/// Result type alias for `ClientError`.
pub type Result<T> = std::result::Result<T, ClientError>;
