//! reqwest-backed transport.

use std::sync::Arc;

use secrecy::ExposeSecret;
use serde_json::Value;
use tracing::instrument;
use url::Url;

use super::{ApiRequest, ApiResponse, PersistentCookieJar, Transport, TransportError};
use crate::config::ClientConfig;
use crate::storage::KeyValueStorage;

/// HTTP transport to the remote service.
///
/// Resolves request paths against the configured base URL and keeps session
/// cookies in a [`PersistentCookieJar`], so the refresh endpoint sees the
/// same session evidence after a restart.
#[derive(Clone)]
pub struct HttpTransport {
    inner: Arc<HttpTransportInner>,
}

struct HttpTransportInner {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpTransport {
    /// Create a transport for `config.api_url`.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Http` if the HTTP client cannot be built.
    pub fn new(
        config: &ClientConfig,
        storage: Arc<dyn KeyValueStorage>,
    ) -> Result<Self, TransportError> {
        let jar = Arc::new(PersistentCookieJar::restore(storage));
        let client = reqwest::Client::builder()
            .cookie_provider(jar)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(HttpTransportInner {
                client,
                base_url: config.api_url.clone(),
            }),
        })
    }

    /// Absolute URL for a request path such as `/auth/login`.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::InvalidPath` if the path cannot be joined.
    pub fn url_for(&self, path: &str) -> Result<Url, TransportError> {
        self.inner
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|source| TransportError::InvalidPath {
                path: path.to_string(),
                source,
            })
    }
}

/// Empty bodies become `Null`; anything that is not JSON is kept as text.
fn parse_body(text: String) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}

impl Transport for HttpTransport {
    #[instrument(skip(self, request), fields(method = %request.method(), path = %request.path()))]
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let mut url = self.url_for(request.path())?;
        if !request.query_pairs().is_empty() {
            url.query_pairs_mut().extend_pairs(request.query_pairs());
        }

        let mut builder = self.inner.client.request(request.method().clone(), url);
        if let Some(token) = request.bearer() {
            builder = builder.bearer_auth(token.expose_secret());
        }
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;
        tracing::debug!(status = %status, bytes = text.len(), "Response received");

        Ok(ApiResponse::new(status, parse_body(text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn transport() -> HttpTransport {
        let config = ClientConfig::new(Url::parse("http://localhost:5000/api").unwrap());
        HttpTransport::new(&config, Arc::new(MemoryStorage::new())).unwrap()
    }

    #[test]
    fn test_url_for_keeps_base_path() {
        let transport = transport();
        assert_eq!(
            transport.url_for("/auth/refresh-token").unwrap().as_str(),
            "http://localhost:5000/api/auth/refresh-token"
        );
        assert_eq!(
            transport.url_for("orders/my").unwrap().as_str(),
            "http://localhost:5000/api/orders/my"
        );
    }

    #[test]
    fn test_parse_body() {
        assert_eq!(parse_body(String::new()), Value::Null);
        assert_eq!(
            parse_body("{\"ok\":true}".to_string()),
            serde_json::json!({ "ok": true })
        );
        assert_eq!(
            parse_body("Unauthorized".to_string()),
            Value::String("Unauthorized".to_string())
        );
    }
}
