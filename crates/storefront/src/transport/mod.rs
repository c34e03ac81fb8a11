//! Request/response boundary to the remote service.
//!
//! The session coordinator only ever talks to a [`Transport`]. The real one
//! is [`HttpTransport`] (reqwest with a persistent cookie jar); tests plug in
//! scripted transports instead.
//!
//! A transport returns `Ok` for every HTTP status it receives. Classifying
//! statuses (expired credential, final failure) is the coordinator's job.

mod cookies;
mod http;

use std::future::Future;

pub use cookies::{COOKIE_KEY, PersistentCookieJar};
pub use http::HttpTransport;
pub use reqwest::{Method, StatusCode};

use secrecy::SecretString;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// Errors raised before a response status is available.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP request failed (connection, TLS, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The request path could not be resolved against the base URL.
    #[error("Invalid request path {path}: {source}")]
    InvalidPath {
        path: String,
        #[source]
        source: url::ParseError,
    },

    /// The service could not be reached.
    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

/// An outgoing request.
///
/// The bearer credential and the retry marker are owned by the session
/// coordinator; callers only describe method, path, query and body.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<Value>,
    bearer: Option<SecretString>,
    retried: bool,
}

impl ApiRequest {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            bearer: None,
            retried: false,
        }
    }

    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Attach a JSON body.
    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Append a query parameter.
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    #[must_use]
    pub const fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Bearer token the transport must send, if any.
    #[must_use]
    pub const fn bearer(&self) -> Option<&SecretString> {
        self.bearer.as_ref()
    }

    /// Whether this request already went through a session refresh.
    #[must_use]
    pub const fn is_retried(&self) -> bool {
        self.retried
    }

    pub(crate) fn authorize(&mut self, token: Option<SecretString>) {
        self.bearer = token;
    }

    pub(crate) fn mark_retried(&mut self) {
        self.retried = true;
    }
}

/// A response with any status.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    status: StatusCode,
    body: Value,
}

impl ApiResponse {
    /// `body` is `Value::Null` for empty bodies and `Value::String` for
    /// bodies that are not JSON.
    #[must_use]
    pub const fn new(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub const fn body(&self) -> &Value {
        &self.body
    }

    #[must_use]
    pub fn into_body(self) -> Value {
        self.body
    }

    /// Decode the body into a typed value.
    ///
    /// # Errors
    ///
    /// Returns a `serde_json::Error` if the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.body)
    }
}

/// Something that can deliver an [`ApiRequest`] to the remote service.
pub trait Transport: Send + Sync {
    /// Send the request as-is, attaching `request.bearer()` when present.
    fn send(
        &self,
        request: ApiRequest,
    ) -> impl Future<Output = Result<ApiResponse, TransportError>> + Send;
}
