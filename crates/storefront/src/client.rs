//! The storefront client handle.

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::config::ClientConfig;
use crate::error::Result;
use crate::session::{CredentialStore, SessionCoordinator};
use crate::state::{CartStore, ClientState};
use crate::storage::{FileStorage, KeyValueStorage};
use crate::transport::{ApiRequest, ApiResponse, HttpTransport, Transport};

/// Entry point for everything the storefront does.
///
/// Owns the [`ClientState`] and the [`SessionCoordinator`] every request goes
/// through. Cheap to clone; clones share the cart, credential and in-flight
/// refresh.
///
/// Typed operations (`login`, `menu`, `place_order`, ...) live in
/// [`crate::api`].
pub struct StorefrontClient<T = HttpTransport> {
    state: ClientState,
    session: Arc<SessionCoordinator<T>>,
}

impl StorefrontClient<HttpTransport> {
    /// Build a client from configuration, restoring the persisted
    /// credential and cookies from `config.state_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let storage: Arc<dyn KeyValueStorage> = Arc::new(FileStorage::new(config.state_dir.clone()));
        let credentials = Arc::new(CredentialStore::restore(Arc::clone(&storage)));
        let transport = HttpTransport::new(config, storage)?;

        tracing::info!(
            api_url = %config.api_url,
            state_dir = %config.state_dir.display(),
            authenticated = credentials.is_authenticated(),
            "Storefront client ready"
        );

        let session = SessionCoordinator::new(transport, Arc::clone(&credentials))
            .with_refresh_timeout(config.refresh_timeout);
        Ok(Self::from_parts(ClientState::new(credentials), session))
    }
}

impl<T: Transport> StorefrontClient<T> {
    /// Build a client over any transport with the given credential store.
    #[must_use]
    pub fn new(transport: T, credentials: Arc<CredentialStore>) -> Self {
        let session = SessionCoordinator::new(transport, Arc::clone(&credentials));
        Self::from_parts(ClientState::new(credentials), session)
    }

    /// Assemble a client from an existing state and coordinator.
    ///
    /// The coordinator must share `state`'s credential store.
    #[must_use]
    pub fn from_parts(state: ClientState, session: SessionCoordinator<T>) -> Self {
        Self {
            state,
            session: Arc::new(session),
        }
    }

    #[must_use]
    pub const fn state(&self) -> &ClientState {
        &self.state
    }

    #[must_use]
    pub fn cart(&self) -> &CartStore {
        self.state.cart()
    }

    #[must_use]
    pub fn credentials(&self) -> &CredentialStore {
        self.state.credentials()
    }

    #[must_use]
    pub fn session(&self) -> &SessionCoordinator<T> {
        &self.session
    }

    /// Send an arbitrary request through the session coordinator.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Session` for a final non-success response,
    /// transport failure or failed refresh.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        Ok(self.session.execute(request).await?)
    }

    /// Send a request and decode the JSON response body.
    ///
    /// # Errors
    ///
    /// As [`send`](Self::send), plus `ClientError::Decode` if the body does
    /// not match `R`.
    pub async fn fetch<R: DeserializeOwned>(&self, request: ApiRequest) -> Result<R> {
        let response = self.send(request).await?;
        Ok(response.json()?)
    }
}

impl<T> Clone for StorefrontClient<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            session: Arc::clone(&self.session),
        }
    }
}
