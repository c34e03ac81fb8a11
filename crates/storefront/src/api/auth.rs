//! Sign-in, registration and sign-out.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use feastly_core::{Email, Role, UserRecord};

use crate::client::StorefrontClient;
use crate::error::{ClientError, Result};
use crate::transport::{ApiRequest, Transport};

pub const LOGIN_PATH: &str = "/auth/login";
pub const REGISTER_PATH: &str = "/auth/register";
pub const LOGOUT_PATH: &str = "/auth/logout";

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    #[serde(alias = "token")]
    access_token: String,
    user: UserRecord,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
    role: Role,
}

impl<T: Transport> StorefrontClient<T> {
    /// Sign in and replace the stored credential.
    ///
    /// The service also sets the session cookie the refresh endpoint relies
    /// on; the transport keeps it.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Email` for a malformed address and
    /// `ClientError::Session` if the service rejects the credentials.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<UserRecord> {
        let email = Email::parse(email)?;
        let body = serde_json::to_value(LoginRequest {
            email: email.as_str(),
            password: password.expose_secret(),
        })?;

        let response = self
            .session()
            .execute_anonymous(ApiRequest::post(LOGIN_PATH).json(body))
            .await?;
        let LoginResponse { access_token, user } = response.json()?;

        tracing::info!(user_id = %user.id, role = user.role.as_str(), "Signed in");
        self.credentials()
            .sign_in(user.clone(), SecretString::from(access_token));
        Ok(user)
    }

    /// Create a customer account. Does not sign in.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Email` for a malformed address and
    /// `ClientError::Session` if the service refuses the registration.
    #[instrument(skip(self, password))]
    pub async fn register(&self, name: &str, email: &str, password: &SecretString) -> Result<()> {
        let email = Email::parse(email)?;
        let body = serde_json::to_value(RegisterRequest {
            name: name.trim(),
            email: email.as_str(),
            password: password.expose_secret(),
            role: Role::Customer,
        })?;

        self.session()
            .execute_anonymous(ApiRequest::post(REGISTER_PATH).json(body))
            .await?;
        tracing::info!("Account registered");
        Ok(())
    }

    /// Sign out.
    ///
    /// The service call is best effort: the local credential is cleared
    /// whether or not it succeeds.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        let result = self
            .session()
            .execute_anonymous(ApiRequest::post(LOGOUT_PATH))
            .await;
        if let Err(error) = result {
            tracing::warn!(%error, "Logout request failed, clearing local session anyway");
        }
        self.credentials().clear();
        tracing::info!("Signed out");
    }

    /// The signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotAuthenticated` when no credential is held.
    pub fn current_user(&self) -> Result<UserRecord> {
        let credential = self.credentials().snapshot();
        match credential.user() {
            Some(user) if credential.is_authenticated() => Ok(user.clone()),
            _ => Err(ClientError::NotAuthenticated),
        }
    }

    /// Replace the stored user record after a profile change, keeping the token.
    pub fn update_user(&self, user: UserRecord) {
        tracing::debug!(user_id = %user.id, "User record updated");
        self.credentials().update_user(user);
    }
}
