//! Feastly storefront client.
//!
//! The async half of the storefront: everything that talks to the remote
//! service, plus the shared client state.
//!
//! # Architecture
//!
//! - [`transport`] - Request/response boundary (`reqwest` with a persistent cookie jar)
//! - [`session`] - Credential store and the coordinator that refreshes it on `401`
//! - [`state`] - Cloneable client state owning the credential and the cart
//! - [`client`] - The [`StorefrontClient`] handle tying them together
//! - [`api`] - Typed operations: login, menu, order placement, order history
//!
//! # Example
//!
//! ```rust,ignore
//! use feastly_storefront::{ClientConfig, StorefrontClient};
//!
//! let config = ClientConfig::from_env()?;
//! let client = StorefrontClient::from_config(&config)?;
//!
//! client.login("mona@feastly.test", &password).await?;
//! let menu = client.menu_by_category().await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod session;
pub mod state;
pub mod storage;
pub mod transport;

pub use client::StorefrontClient;
pub use config::{ClientConfig, ConfigError, LogFormat};
pub use error::{ClientError, Result};
pub use session::{CredentialStore, SessionCoordinator, SessionError};
pub use state::{CartStore, ClientState};
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Transport, TransportError};
