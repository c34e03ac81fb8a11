//! Integration tests for the Feastly storefront client.
//!
//! The tests drive a real [`StorefrontClient`] over HTTP against
//! [`MockService`], an in-process axum server that mimics the storefront
//! service: JWT-style access tokens that can be expired on demand, a
//! `refreshToken` session cookie, the product listing and order endpoints.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p feastly-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `session_refresh` - Login, persistence, single-flight refresh, sign-out
//! - `cart_checkout` - Cart building, order placement and order history

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use feastly_storefront::{ClientConfig, StorefrontClient};
use serde::Deserialize;
use serde_json::{Value, json};
use url::Url;

const SESSION_COOKIE: &str = "refreshToken";

/// An account known to the mock service.
#[derive(Debug, Clone)]
struct Account {
    id: String,
    name: String,
    email: String,
    password: String,
    role: String,
}

impl Account {
    fn to_json(&self) -> Value {
        json!({
            "_id": self.id,
            "name": self.name,
            "email": self.email,
            "role": self.role,
        })
    }
}

#[derive(Default)]
struct ServiceState {
    accounts: Mutex<Vec<Account>>,
    /// Session cookie value -> account email.
    sessions: Mutex<HashMap<String, String>>,
    /// Live access token -> account email.
    access_tokens: Mutex<HashMap<String, String>>,
    orders: Mutex<Vec<(String, Value)>>,
    sequence: AtomicUsize,
    refresh_calls: AtomicUsize,
    unauthorized: AtomicUsize,
    hold_refresh_until: AtomicUsize,
    reject_refresh: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ServiceState {
    fn next(&self, prefix: &str) -> String {
        format!("{prefix}-{}", self.sequence.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn issue_access_token(&self, email: &str) -> String {
        let token = self.next("access");
        lock(&self.access_tokens).insert(token.clone(), email.to_string());
        token
    }

    /// Email of the bearer, or the `401` the service answers with.
    fn authorize(&self, headers: &HeaderMap) -> Result<String, Response> {
        let email = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .and_then(|token| lock(&self.access_tokens).get(token).cloned());

        email.ok_or_else(|| {
            self.unauthorized.fetch_add(1, Ordering::SeqCst);
            message(StatusCode::UNAUTHORIZED, "jwt expired")
        })
    }
}

fn message(status: StatusCode, text: &str) -> Response {
    (status, Json(json!({ "message": text }))).into_response()
}

fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}

fn menu() -> Value {
    json!([
        {
            "_id": "p1",
            "category": "Pizza",
            "name": "Margherita",
            "description": "Tomato, mozzarella, basil",
            "image": "margherita.jpg",
            "basePrice": 8,
            "sizes": [
                { "id": "md", "name": "Medium", "price": 0 },
                { "id": "lg", "name": "Large", "price": 2 }
            ],
            "extras": [
                { "id": "x1", "name": "Cheese", "price": 1 },
                { "id": "x2", "name": "Olives", "price": 0.5 }
            ]
        },
        {
            "_id": "p9",
            "category": "Drinks",
            "name": "Cola",
            "basePrice": 1.5
        },
        {
            "_id": "p2",
            "category": "Pizza",
            "name": "Pepperoni",
            "basePrice": 9.5,
            "extras": [{ "name": "Cheese", "price": 1 }]
        }
    ])
}

// =============================================================================
// Handlers
// =============================================================================

#[derive(Deserialize)]
struct LoginBody {
    email: String,
    password: String,
}

async fn login(State(state): State<Arc<ServiceState>>, Json(body): Json<LoginBody>) -> Response {
    let account = lock(&state.accounts)
        .iter()
        .find(|a| a.email == body.email && a.password == body.password)
        .cloned();
    let Some(account) = account else {
        return message(StatusCode::UNAUTHORIZED, "Invalid email or password");
    };

    let session = state.next("session");
    lock(&state.sessions).insert(session.clone(), account.email.clone());
    let token = state.issue_access_token(&account.email);

    (
        [(
            header::SET_COOKIE,
            format!("{SESSION_COOKIE}={session}; Path=/; HttpOnly"),
        )],
        Json(json!({ "accessToken": token, "user": account.to_json() })),
    )
        .into_response()
}

#[derive(Deserialize)]
struct RegisterBody {
    name: String,
    email: String,
    password: String,
    role: String,
}

async fn register(
    State(state): State<Arc<ServiceState>>,
    Json(body): Json<RegisterBody>,
) -> Response {
    let mut accounts = lock(&state.accounts);
    if accounts.iter().any(|a| a.email == body.email) {
        return message(StatusCode::CONFLICT, "User already exists");
    }
    let id = format!("u{}", accounts.len() + 1);
    accounts.push(Account {
        id,
        name: body.name,
        email: body.email,
        password: body.password,
        role: body.role,
    });
    message(StatusCode::CREATED, "User registered")
}

async fn refresh(State(state): State<Arc<ServiceState>>, headers: HeaderMap) -> Response {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);

    while state.unauthorized.load(Ordering::SeqCst) < state.hold_refresh_until.load(Ordering::SeqCst)
    {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    if state.reject_refresh.load(Ordering::SeqCst) {
        return message(StatusCode::FORBIDDEN, "Refresh token revoked");
    }
    let email = session_cookie(&headers).and_then(|s| lock(&state.sessions).get(&s).cloned());
    let Some(email) = email else {
        return message(StatusCode::UNAUTHORIZED, "No refresh token");
    };

    let token = state.issue_access_token(&email);
    Json(json!({ "accessToken": token })).into_response()
}

async fn logout(State(state): State<Arc<ServiceState>>, headers: HeaderMap) -> Response {
    if let Some(session) = session_cookie(&headers) {
        lock(&state.sessions).remove(&session);
    }
    (
        [(
            header::SET_COOKIE,
            format!("{SESSION_COOKIE}=; Path=/; Max-Age=0"),
        )],
        Json(json!({ "message": "Logged out" })),
    )
        .into_response()
}

async fn products() -> Json<Value> {
    Json(json!({ "data": menu() }))
}

async fn best_sellers() -> Json<Value> {
    let items: Vec<Value> = menu()
        .as_array()
        .map(|items| items.iter().take(1).cloned().collect())
        .unwrap_or_default();
    Json(json!({ "data": items }))
}

async fn create_order(
    State(state): State<Arc<ServiceState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let email = match state.authorize(&headers) {
        Ok(email) => email,
        Err(response) => return response,
    };
    if body["items"].as_array().is_none_or(Vec::is_empty) {
        return message(StatusCode::BAD_REQUEST, "Order has no items");
    }
    if body["address"].as_str().is_none_or(str::is_empty) {
        return message(StatusCode::BAD_REQUEST, "Address is required");
    }

    let mut order = body;
    order["_id"] = json!(state.next("order"));
    order["status"] = json!("pending");
    order["createdAt"] = json!("2026-10-17T12:00:00.000Z");
    lock(&state.orders).push((email, order.clone()));

    (
        StatusCode::CREATED,
        Json(json!({ "message": "Order created", "order": order })),
    )
        .into_response()
}

async fn my_orders(State(state): State<Arc<ServiceState>>, headers: HeaderMap) -> Response {
    let email = match state.authorize(&headers) {
        Ok(email) => email,
        Err(response) => return response,
    };
    let orders: Vec<Value> = lock(&state.orders)
        .iter()
        .filter(|(owner, _)| *owner == email)
        .map(|(_, order)| order.clone())
        .rev()
        .collect();
    Json(orders).into_response()
}

// =============================================================================
// MockService
// =============================================================================

/// In-process storefront service listening on a random local port.
///
/// The server task stops when the service is dropped.
pub struct MockService {
    addr: SocketAddr,
    state: Arc<ServiceState>,
    server: tokio::task::JoinHandle<()>,
}

impl MockService {
    /// Bind to `127.0.0.1:0` and start serving.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn start() -> Self {
        let state = Arc::new(ServiceState::default());
        let app = Router::new()
            .route("/api/auth/login", post(login))
            .route("/api/auth/register", post(register))
            .route("/api/auth/refresh-token", get(refresh))
            .route("/api/auth/logout", post(logout))
            .route("/api/products", get(products))
            .route("/api/products/best-sellers", get(best_sellers))
            .route("/api/orders/create", post(create_order))
            .route("/api/orders/my", get(my_orders))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock service");
        let addr = listener.local_addr().expect("Mock service has no address");
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self {
            addr,
            state,
            server,
        }
    }

    /// Base URL clients should be configured with.
    ///
    /// # Panics
    ///
    /// Never in practice; the address always forms a valid URL.
    #[must_use]
    pub fn api_url(&self) -> Url {
        Url::parse(&format!("http://{}/api", self.addr)).expect("Invalid mock service URL")
    }

    /// Client configuration pointing at this service, persisting under `state_dir`.
    #[must_use]
    pub fn config(&self, state_dir: &Path) -> ClientConfig {
        let mut config = ClientConfig::new(self.api_url());
        config.state_dir = state_dir.to_path_buf();
        config.request_timeout = Duration::from_secs(5);
        config.refresh_timeout = Some(Duration::from_secs(5));
        config
    }

    /// A fresh client, restoring whatever session `state_dir` holds.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    pub fn client(&self, state_dir: &Path) -> StorefrontClient {
        StorefrontClient::from_config(&self.config(state_dir)).expect("Failed to build client")
    }

    /// Register an account directly, bypassing the API.
    pub fn add_account(&self, name: &str, email: &str, password: &str) {
        let mut accounts = lock(&self.state.accounts);
        let id = format!("u{}", accounts.len() + 1);
        accounts.push(Account {
            id,
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            role: "user".to_string(),
        });
    }

    /// Invalidate every access token issued so far. Session cookies stay valid.
    pub fn expire_access_tokens(&self) {
        lock(&self.state.access_tokens).clear();
    }

    /// Make the refresh endpoint wait until this many requests have been
    /// rejected with `401`.
    pub fn hold_refresh_until(&self, unauthorized: usize) {
        self.state
            .hold_refresh_until
            .store(unauthorized, Ordering::SeqCst);
    }

    /// Make the refresh endpoint answer `403`.
    pub fn reject_refresh(&self) {
        self.state.reject_refresh.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn refresh_calls(&self) -> usize {
        self.state.refresh_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn unauthorized_count(&self) -> usize {
        self.state.unauthorized.load(Ordering::SeqCst)
    }

    /// Every order received, oldest first.
    #[must_use]
    pub fn orders(&self) -> Vec<Value> {
        lock(&self.state.orders)
            .iter()
            .map(|(_, order)| order.clone())
            .collect()
    }
}

impl Drop for MockService {
    fn drop(&mut self) {
        self.server.abort();
    }
}
