//! Cookie jar that survives restarts.
//!
//! The refresh endpoint authenticates with a long-lived session cookie rather
//! than the bearer token. A browser keeps that cookie across reloads; this
//! jar does the same by mirroring every `Set-Cookie` it sees into storage and
//! replaying them into a fresh [`Jar`] on startup.
//!
//! A `Max-Age` counts from when the cookie was set, not from each restart:
//! the absolute expiry is stored next to the header, expired cookies are
//! dropped on restore and the rest are replayed with their remaining age.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::HeaderValue;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::storage::KeyValueStorage;

/// Storage key for the persisted cookies.
pub const COOKIE_KEY: &str = "cookies";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct StoredCookie {
    /// URL of the response that set the cookie (drives default domain/path).
    url: String,
    /// Raw `Set-Cookie` header value.
    header: String,
    /// When a `Max-Age` cookie runs out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
}

impl StoredCookie {
    fn name(&self) -> &str {
        cookie_name(&self.header)
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// The header to replay at `now`, with `Max-Age` cut to what is left.
    fn header_at(&self, now: DateTime<Utc>) -> String {
        match self.expires_at {
            Some(at) => format!(
                "{}; Max-Age={}",
                without_max_age(&self.header),
                (at - now).num_seconds().max(1)
            ),
            None => self.header.clone(),
        }
    }
}

fn cookie_name(header: &str) -> &str {
    header.split_once('=').map_or(header, |(name, _)| name).trim()
}

fn is_max_age(attribute: &str) -> bool {
    attribute
        .split_once('=')
        .is_some_and(|(key, _)| key.trim().eq_ignore_ascii_case("max-age"))
}

fn max_age(header: &str) -> Option<i64> {
    header
        .split(';')
        .skip(1)
        .filter(|attribute| is_max_age(attribute))
        .find_map(|attribute| attribute.split_once('=')?.1.trim().parse().ok())
}

fn without_max_age(header: &str) -> String {
    let mut parts = header.split(';');
    let pair = parts.next().unwrap_or_default();
    std::iter::once(pair)
        .chain(parts.filter(|attribute| !is_max_age(attribute)))
        .collect::<Vec<_>>()
        .join(";")
}

/// A [`Jar`] whose contents are persisted to a [`KeyValueStorage`].
pub struct PersistentCookieJar {
    jar: Jar,
    stored: Mutex<Vec<StoredCookie>>,
    storage: Arc<dyn KeyValueStorage>,
}

impl PersistentCookieJar {
    /// Load previously stored cookies. Unreadable entries start an empty jar.
    #[must_use]
    pub fn restore(storage: Arc<dyn KeyValueStorage>) -> Self {
        let mut stored: Vec<StoredCookie> = match storage.load(COOKIE_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Discarding malformed stored cookies");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read stored cookies");
                Vec::new()
            }
        };

        let now = Utc::now();
        let loaded = stored.len();
        stored.retain(|cookie| !cookie.is_expired(now));

        let jar = Jar::default();
        for cookie in &stored {
            if let Ok(url) = Url::parse(&cookie.url) {
                jar.add_cookie_str(&cookie.header_at(now), &url);
            }
        }
        tracing::debug!(count = stored.len(), "Restored session cookies");

        let expired = loaded - stored.len();
        let restored = Self {
            jar,
            stored: Mutex::new(stored),
            storage,
        };
        if expired > 0 {
            let stored = restored.stored.lock().unwrap_or_else(PoisonError::into_inner);
            restored.persist(&stored);
        }
        restored
    }

    fn persist(&self, stored: &[StoredCookie]) {
        let result = serde_json::to_string(stored)
            .map_err(|e| e.to_string())
            .and_then(|raw| {
                self.storage
                    .store(COOKIE_KEY, &raw)
                    .map_err(|e| e.to_string())
            });
        if let Err(error) = result {
            tracing::warn!(%error, "Failed to persist session cookies");
        }
    }
}

impl CookieStore for PersistentCookieJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let headers: Vec<HeaderValue> = cookie_headers.cloned().collect();
        self.jar.set_cookies(&mut headers.iter(), url);

        let now = Utc::now();
        let mut stored = self.stored.lock().unwrap_or_else(PoisonError::into_inner);
        for header in headers.iter().filter_map(|h| h.to_str().ok()) {
            let name = cookie_name(header);
            stored.retain(|cookie| cookie.name() != name);

            let age = max_age(header);
            if age.is_some_and(|secs| secs <= 0) {
                // Deletion.
                continue;
            }
            stored.push(StoredCookie {
                url: url.to_string(),
                header: header.to_string(),
                expires_at: age
                    .and_then(TimeDelta::try_seconds)
                    .and_then(|age| now.checked_add_signed(age)),
            });
        }
        self.persist(&stored);
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        self.jar.cookies(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn url() -> Url {
        Url::parse("http://localhost:5000/auth/login").unwrap()
    }

    #[test]
    fn test_cookie_survives_restore() {
        let storage: Arc<dyn KeyValueStorage> = Arc::new(MemoryStorage::new());

        let jar = PersistentCookieJar::restore(Arc::clone(&storage));
        let header = HeaderValue::from_static("refreshToken=r1; Path=/; HttpOnly");
        jar.set_cookies(&mut std::iter::once(&header), &url());

        let restored = PersistentCookieJar::restore(storage);
        let refresh_url = Url::parse("http://localhost:5000/auth/refresh-token").unwrap();
        let cookies = restored.cookies(&refresh_url).unwrap();
        assert_eq!(cookies.to_str().unwrap(), "refreshToken=r1");
    }

    #[test]
    fn test_newer_cookie_replaces_older_entry() {
        let storage: Arc<dyn KeyValueStorage> = Arc::new(MemoryStorage::new());
        let jar = PersistentCookieJar::restore(Arc::clone(&storage));

        let first = HeaderValue::from_static("refreshToken=r1; Path=/");
        let second = HeaderValue::from_static("refreshToken=r2; Path=/");
        jar.set_cookies(&mut std::iter::once(&first), &url());
        jar.set_cookies(&mut std::iter::once(&second), &url());

        let raw = storage.load(COOKIE_KEY).unwrap().unwrap();
        let stored: Vec<StoredCookie> = serde_json::from_str(&raw).unwrap();
        assert_eq!(stored.len(), 1);
        assert!(stored[0].header.starts_with("refreshToken=r2"));
    }

    fn stored_with_expiry(storage: &Arc<dyn KeyValueStorage>, expires_at: DateTime<Utc>) {
        let cookie = StoredCookie {
            url: url().to_string(),
            header: "refreshToken=r1; Path=/; HttpOnly; Max-Age=604800".to_string(),
            expires_at: Some(expires_at),
        };
        storage
            .store(COOKIE_KEY, &serde_json::to_string(&[cookie]).unwrap())
            .unwrap();
    }

    #[test]
    fn test_max_age_is_stored_as_absolute_expiry() {
        let storage: Arc<dyn KeyValueStorage> = Arc::new(MemoryStorage::new());
        let jar = PersistentCookieJar::restore(Arc::clone(&storage));

        let before = Utc::now();
        let header = HeaderValue::from_static("refreshToken=r1; Path=/; max-age=3600");
        jar.set_cookies(&mut std::iter::once(&header), &url());

        let raw = storage.load(COOKIE_KEY).unwrap().unwrap();
        let stored: Vec<StoredCookie> = serde_json::from_str(&raw).unwrap();
        let expires_at = stored[0].expires_at.unwrap();
        assert!(expires_at >= before + TimeDelta::seconds(3600));
        assert!(expires_at <= Utc::now() + TimeDelta::seconds(3600));
    }

    #[test]
    fn test_expired_cookie_is_dropped_on_restore() {
        let storage: Arc<dyn KeyValueStorage> = Arc::new(MemoryStorage::new());
        stored_with_expiry(&storage, Utc::now() - TimeDelta::seconds(1));

        let jar = PersistentCookieJar::restore(Arc::clone(&storage));

        assert!(jar.cookies(&url()).is_none());
        let raw = storage.load(COOKIE_KEY).unwrap().unwrap();
        assert_eq!(raw, "[]");
    }

    #[test]
    fn test_restore_keeps_remaining_lifetime() {
        let storage: Arc<dyn KeyValueStorage> = Arc::new(MemoryStorage::new());
        stored_with_expiry(&storage, Utc::now() + TimeDelta::seconds(120));

        let jar = PersistentCookieJar::restore(Arc::clone(&storage));

        assert_eq!(
            jar.cookies(&url()).unwrap().to_str().unwrap(),
            "refreshToken=r1"
        );
        let now = Utc::now();
        let header = jar.stored.lock().unwrap()[0].header_at(now);
        assert!(header.starts_with("refreshToken=r1; Path=/; HttpOnly; Max-Age="));
        let remaining: i64 = header.rsplit('=').next().unwrap().parse().unwrap();
        assert!((1..=120).contains(&remaining));
    }

    #[test]
    fn test_deleting_cookie_removes_stored_entry() {
        let storage: Arc<dyn KeyValueStorage> = Arc::new(MemoryStorage::new());
        let jar = PersistentCookieJar::restore(Arc::clone(&storage));

        let set = HeaderValue::from_static("refreshToken=r1; Path=/");
        let delete = HeaderValue::from_static("refreshToken=; Path=/; Max-Age=0");
        jar.set_cookies(&mut std::iter::once(&set), &url());
        jar.set_cookies(&mut std::iter::once(&delete), &url());

        assert!(jar.cookies(&url()).is_none());
        assert_eq!(storage.load(COOKIE_KEY).unwrap().as_deref(), Some("[]"));
        assert!(PersistentCookieJar::restore(storage).cookies(&url()).is_none());
    }

    #[test]
    fn test_malformed_storage_starts_empty() {
        let storage: Arc<dyn KeyValueStorage> = Arc::new(MemoryStorage::new());
        storage.store(COOKIE_KEY, "not json").unwrap();

        let jar = PersistentCookieJar::restore(storage);
        assert!(jar.cookies(&url()).is_none());
    }
}
