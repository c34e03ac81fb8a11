//! Request pipeline with transparent credential refresh.

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::instrument;

use super::{Admission, CredentialStore, RefreshError, RefreshGate, RefreshLease, SessionError};
use crate::transport::{ApiRequest, ApiResponse, Transport};

/// Endpoint that trades the session cookie for a new bearer token.
pub const REFRESH_PATH: &str = "/auth/refresh-token";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    #[serde(alias = "token")]
    access_token: String,
}

/// Wraps a [`Transport`] so every request carries the current credential and
/// survives credential expiry.
///
/// For each request sent through [`execute`](Self::execute):
///
/// 1. The current token, if any, is attached as a bearer header.
/// 2. A success is returned unchanged.
/// 3. A `401` on a request that has not been retried marks it retried. If the
///    credential has already moved on from the token the request carried, it
///    is replayed with the current one. Otherwise it joins the
///    [`RefreshGate`]: the first such request performs the single refresh,
///    later ones wait for it, and one whose `401` arrives after that refresh
///    settled takes its outcome. On success the new token is stored and every
///    waiting request is replayed with it; on failure the credential is
///    cleared and every waiting request fails with the refresh error.
/// 4. Any other failure, including a second `401`, is returned unchanged.
///
/// A refresh that returns after the user signed in or out is discarded with
/// [`RefreshError::Superseded`].
pub struct SessionCoordinator<T> {
    transport: T,
    credentials: Arc<CredentialStore>,
    gate: RefreshGate,
    refresh_timeout: Option<Duration>,
}

impl<T: Transport> SessionCoordinator<T> {
    /// Create a coordinator with no bound on refresh duration.
    #[must_use]
    pub fn new(transport: T, credentials: Arc<CredentialStore>) -> Self {
        Self {
            transport,
            credentials,
            gate: RefreshGate::new(),
            refresh_timeout: None,
        }
    }

    /// Fail a refresh that has not settled after `timeout`.
    #[must_use]
    pub const fn with_refresh_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.refresh_timeout = timeout;
        self
    }

    #[must_use]
    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    #[must_use]
    pub const fn gate(&self) -> &RefreshGate {
        &self.gate
    }

    /// Send an authenticated request, refreshing the credential if needed.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Status` for a final non-success response,
    /// `SessionError::Transport` if no response arrived, and
    /// `SessionError::Refresh` if the credential expired and the refresh failed.
    #[instrument(skip(self, request), fields(method = %request.method(), path = %request.path()))]
    pub async fn execute(&self, mut request: ApiRequest) -> Result<ApiResponse, SessionError> {
        let sent_at = self.gate.cycle();
        request.authorize(self.credentials.token());
        let response = self.transport.send(request.clone()).await?;

        if response.status() != StatusCode::UNAUTHORIZED || request.is_retried() {
            return into_result(response);
        }
        request.mark_retried();

        let token = match self.newer_token(&request) {
            Some(current) => current,
            None => match self.gate.admit_since(sent_at) {
                Admission::Settled(outcome) => outcome?,
                Admission::Follower(waiter) => waiter.wait().await?,
                Admission::Leader(lease) => self.lead_refresh(lease).await?,
            },
        };

        tracing::debug!("Replaying request with refreshed credential");
        request.authorize(Some(token));
        into_result(self.transport.send(request).await?)
    }

    /// Send a request without a bearer token and without refresh handling.
    ///
    /// Used for the auth endpoints themselves, where a `401` means bad
    /// credentials rather than an expired session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Status` for a non-success response and
    /// `SessionError::Transport` if no response arrived.
    #[instrument(skip(self, request), fields(method = %request.method(), path = %request.path()))]
    pub async fn execute_anonymous(&self, request: ApiRequest) -> Result<ApiResponse, SessionError> {
        into_result(self.transport.send(request).await?)
    }

    /// The stored token, if it is no longer the one `request` was sent with.
    fn newer_token(&self, request: &ApiRequest) -> Option<SecretString> {
        let current = self.credentials.token()?;
        let unchanged = request
            .bearer()
            .is_some_and(|sent| sent.expose_secret() == current.expose_secret());
        (!unchanged).then_some(current)
    }

    async fn lead_refresh(&self, lease: RefreshLease<'_>) -> Result<SecretString, RefreshError> {
        tracing::info!("Credential expired, refreshing session");
        let epoch = self.credentials.epoch();

        let outcome = match self.refresh().await {
            Ok(token) if self.credentials.replace_token(token.clone(), epoch) => Ok(token),
            Ok(_) => {
                tracing::warn!("Session changed during refresh, discarding refreshed token");
                Err(RefreshError::Superseded)
            }
            Err(error) => {
                tracing::warn!(%error, "Session refresh failed, signing out");
                self.credentials.expire(epoch);
                Err(error)
            }
        };
        lease.settle(&outcome);
        outcome
    }

    async fn refresh(&self) -> Result<SecretString, RefreshError> {
        let call = self.transport.send(ApiRequest::get(REFRESH_PATH));
        let sent = match self.refresh_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| RefreshError::TimedOut(limit))?,
            None => call.await,
        };
        let response = sent.map_err(|e| RefreshError::Transport(Arc::new(e)))?;

        if !response.status().is_success() {
            return Err(RefreshError::Rejected {
                status: response.status(),
            });
        }
        let body: RefreshResponse = response.json().map_err(|_| RefreshError::MissingToken)?;
        Ok(SecretString::from(body.access_token))
    }
}

fn into_result(response: ApiResponse) -> Result<ApiResponse, SessionError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(SessionError::Status {
            status: response.status(),
            body: response.into_body(),
        })
    }
}
