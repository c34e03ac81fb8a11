//! Typed operations against the storefront service.
//!
//! Each submodule adds methods to [`StorefrontClient`](crate::StorefrontClient):
//!
//! - [`auth`] - login, registration, logout and the signed-in user
//! - [`menu`] - product listing and best sellers
//! - [`orders`] - order placement from the cart and order history
//!
//! The auth endpoints bypass session refresh; everything else goes through
//! the [`SessionCoordinator`](crate::session::SessionCoordinator).

pub mod auth;
pub mod menu;
pub mod orders;

pub use auth::{LOGIN_PATH, LOGOUT_PATH, REGISTER_PATH};
pub use menu::{BEST_SELLERS_PATH, MENU_PATH};
pub use orders::{MY_ORDERS_PATH, OrderLine, OrderProduct, OrderSummary, PLACE_ORDER_PATH};
