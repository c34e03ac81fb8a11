//! Credential store.
//!
//! Holds the bearer token and the user it was issued for. Every change is
//! written through to durable storage under [`CREDENTIAL_KEY`] as
//! `{"user": ..., "token": ...}`, and [`CredentialStore::restore`] reads it
//! back. A missing or unreadable entry restores as signed out.
//!
//! Every sign-in and sign-out starts a new *epoch*. A refresh records the
//! epoch it started in and may only swap its token into that same epoch, so
//! a slow refresh can never revive a session that ended while it was in
//! flight.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use feastly_core::UserRecord;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::storage::{KeyValueStorage, MemoryStorage};

/// Storage key for the persisted credential.
pub const CREDENTIAL_KEY: &str = "auth";

/// The authenticated session: token and user.
///
/// Authenticated exactly when a token is present.
#[derive(Clone, Default)]
pub struct Credential {
    token: Option<SecretString>,
    user: Option<UserRecord>,
}

impl Credential {
    #[must_use]
    pub const fn token(&self) -> Option<&SecretString> {
        self.token.as_ref()
    }

    #[must_use]
    pub const fn user(&self) -> Option<&UserRecord> {
        self.user.as_ref()
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("user", &self.user)
            .finish()
    }
}

/// On-disk shape of a [`Credential`].
#[derive(Serialize, Deserialize)]
struct PersistedCredential {
    #[serde(default)]
    user: Option<UserRecord>,
    #[serde(default)]
    token: Option<String>,
}

impl From<PersistedCredential> for Credential {
    fn from(persisted: PersistedCredential) -> Self {
        Self {
            token: persisted
                .token
                .filter(|token| !token.is_empty())
                .map(SecretString::from),
            user: persisted.user,
        }
    }
}

/// Shared owner of the current [`Credential`].
pub struct CredentialStore {
    current: RwLock<Credential>,
    /// Bumped under the write lock by `sign_in` and `clear`.
    epoch: AtomicU64,
    storage: Arc<dyn KeyValueStorage>,
}

impl CredentialStore {
    /// Load the credential persisted in `storage`.
    #[must_use]
    pub fn restore(storage: Arc<dyn KeyValueStorage>) -> Self {
        let credential = match storage.load(CREDENTIAL_KEY) {
            Ok(Some(raw)) => serde_json::from_str::<PersistedCredential>(&raw)
                .map(Credential::from)
                .unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "Ignoring malformed stored credential");
                    Credential::default()
                }),
            Ok(None) => Credential::default(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read stored credential");
                Credential::default()
            }
        };
        tracing::debug!(
            authenticated = credential.is_authenticated(),
            "Credential restored"
        );

        Self {
            current: RwLock::new(credential),
            epoch: AtomicU64::new(0),
            storage,
        }
    }

    /// A signed-out store backed by memory only.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::restore(Arc::new(MemoryStorage::new()))
    }

    #[must_use]
    pub fn snapshot(&self) -> Credential {
        self.read().clone()
    }

    #[must_use]
    pub fn token(&self) -> Option<SecretString> {
        self.read().token.clone()
    }

    #[must_use]
    pub fn user(&self) -> Option<UserRecord> {
        self.read().user.clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.read().is_authenticated()
    }

    /// The current sign-in epoch, to pass to [`replace_token`](Self::replace_token)
    /// and [`expire`](Self::expire).
    #[must_use]
    pub fn epoch(&self) -> u64 {
        let _current = self.read();
        self.epoch.load(Ordering::Acquire)
    }

    /// Replace the whole credential after a successful login.
    pub fn sign_in(&self, user: UserRecord, token: SecretString) {
        let mut current = self.write();
        *current = Credential {
            token: Some(token),
            user: Some(user),
        };
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.persist(&current);
    }

    /// Swap in a refreshed token, keeping the user.
    ///
    /// Returns `false` and changes nothing if the user signed in or out
    /// since `epoch`.
    pub fn replace_token(&self, token: SecretString, epoch: u64) -> bool {
        let mut current = self.write();
        if self.epoch.load(Ordering::Acquire) != epoch {
            return false;
        }
        current.token = Some(token);
        self.persist(&current);
        true
    }

    /// Replace the user record, keeping the token.
    pub fn update_user(&self, user: UserRecord) {
        let mut current = self.write();
        current.user = Some(user);
        self.persist(&current);
    }

    /// Sign out locally.
    pub fn clear(&self) {
        let mut current = self.write();
        self.reset(&mut current);
    }

    /// Sign out after a failed refresh, unless the session already changed
    /// since `epoch`. Returns whether the credential was cleared.
    pub fn expire(&self, epoch: u64) -> bool {
        let mut current = self.write();
        if self.epoch.load(Ordering::Acquire) != epoch {
            return false;
        }
        self.reset(&mut current);
        true
    }

    fn reset(&self, current: &mut Credential) {
        *current = Credential::default();
        self.epoch.fetch_add(1, Ordering::AcqRel);
        if let Err(error) = self.storage.remove(CREDENTIAL_KEY) {
            tracing::warn!(%error, "Failed to remove stored credential");
        }
    }

    fn persist(&self, credential: &Credential) {
        let persisted = PersistedCredential {
            user: credential.user.clone(),
            token: credential
                .token
                .as_ref()
                .map(|token| token.expose_secret().to_owned()),
        };
        let result = serde_json::to_string(&persisted)
            .map_err(|e| e.to_string())
            .and_then(|raw| {
                self.storage
                    .store(CREDENTIAL_KEY, &raw)
                    .map_err(|e| e.to_string())
            });
        if let Err(error) = result {
            tracing::warn!(%error, "Failed to persist credential");
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Credential> {
        self.current.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Credential> {
        self.current.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("current", &*self.read())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feastly_core::{Email, Role, UserId};

    fn user(name: &str) -> UserRecord {
        UserRecord {
            id: UserId::new("u1"),
            name: name.to_string(),
            email: Email::parse("mona@feastly.test").unwrap(),
            role: Role::Customer,
            address: None,
        }
    }

    fn token_of(store: &CredentialStore) -> Option<String> {
        store.token().map(|t| t.expose_secret().to_owned())
    }

    #[test]
    fn test_sign_in_persists_and_restores() {
        let storage: Arc<dyn KeyValueStorage> = Arc::new(MemoryStorage::new());
        let store = CredentialStore::restore(Arc::clone(&storage));
        assert!(!store.is_authenticated());

        store.sign_in(user("Mona"), SecretString::from("A"));

        let restored = CredentialStore::restore(storage);
        assert!(restored.is_authenticated());
        assert_eq!(token_of(&restored).as_deref(), Some("A"));
        assert_eq!(restored.user().map(|u| u.name), Some("Mona".to_string()));
    }

    #[test]
    fn test_persisted_shape() {
        let storage: Arc<dyn KeyValueStorage> = Arc::new(MemoryStorage::new());
        let store = CredentialStore::restore(Arc::clone(&storage));
        store.sign_in(user("Mona"), SecretString::from("A"));

        let raw = storage.load(CREDENTIAL_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["token"], "A");
        assert_eq!(value["user"]["_id"], "u1");
        assert_eq!(value["user"]["role"], "user");
    }

    #[test]
    fn test_replace_token_keeps_user() {
        let store = CredentialStore::in_memory();
        store.sign_in(user("Mona"), SecretString::from("A"));

        assert!(store.replace_token(SecretString::from("B"), store.epoch()));

        assert_eq!(token_of(&store).as_deref(), Some("B"));
        assert!(store.user().is_some());
    }

    #[test]
    fn test_refreshed_token_cannot_revive_signed_out_session() {
        let storage: Arc<dyn KeyValueStorage> = Arc::new(MemoryStorage::new());
        let store = CredentialStore::restore(Arc::clone(&storage));
        store.sign_in(user("Mona"), SecretString::from("A"));
        let epoch = store.epoch();

        store.clear();

        assert!(!store.replace_token(SecretString::from("B"), epoch));
        assert!(!store.is_authenticated());
        assert_eq!(storage.load(CREDENTIAL_KEY).unwrap(), None);
    }

    #[test]
    fn test_stale_refresh_keeps_newer_sign_in() {
        let store = CredentialStore::in_memory();
        store.sign_in(user("Mona"), SecretString::from("A"));
        let epoch = store.epoch();

        store.sign_in(user("Omar"), SecretString::from("C"));

        assert!(!store.replace_token(SecretString::from("B"), epoch));
        assert!(!store.expire(epoch));
        assert_eq!(token_of(&store).as_deref(), Some("C"));
        assert_eq!(store.user().map(|u| u.name), Some("Omar".to_string()));
    }

    #[test]
    fn test_update_user_keeps_token() {
        let store = CredentialStore::in_memory();
        store.sign_in(user("Mona"), SecretString::from("A"));

        store.update_user(user("Mona Z."));

        assert_eq!(token_of(&store).as_deref(), Some("A"));
        assert_eq!(store.user().map(|u| u.name), Some("Mona Z.".to_string()));
    }

    #[test]
    fn test_clear_removes_persisted_entry() {
        let storage: Arc<dyn KeyValueStorage> = Arc::new(MemoryStorage::new());
        let store = CredentialStore::restore(Arc::clone(&storage));
        store.sign_in(user("Mona"), SecretString::from("A"));

        store.clear();

        assert!(!store.is_authenticated());
        assert!(store.user().is_none());
        assert_eq!(storage.load(CREDENTIAL_KEY).unwrap(), None);
    }

    #[test]
    fn test_malformed_entry_restores_signed_out() {
        let storage: Arc<dyn KeyValueStorage> = Arc::new(MemoryStorage::new());
        storage.store(CREDENTIAL_KEY, "{not json").unwrap();

        let store = CredentialStore::restore(storage);
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_empty_token_is_not_authenticated() {
        let storage: Arc<dyn KeyValueStorage> = Arc::new(MemoryStorage::new());
        storage
            .store(CREDENTIAL_KEY, r#"{"user":null,"token":""}"#)
            .unwrap();

        let store = CredentialStore::restore(storage);
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_debug_redacts_token() {
        let store = CredentialStore::in_memory();
        store.sign_in(user("Mona"), SecretString::from("very-secret"));

        let debug = format!("{store:?}");
        assert!(!debug.contains("very-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
