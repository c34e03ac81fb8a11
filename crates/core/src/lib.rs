//! Feastly Core - Shared types and the cart engine.
//!
//! This crate provides the pieces of the storefront client that never touch
//! the network:
//! - `storefront` - Session coordinator, transport and typed API calls
//! - `cli` - Command-line front end
//!
//! # Architecture
//!
//! The core crate contains only types and synchronous state machines - no I/O,
//! no HTTP clients. The cart engine lives here because every operation on it
//! completes without suspending.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, emails, roles, menu items and orders
//! - [`cart`] - Cart line identity, pricing and the order draft built at checkout

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod types;

pub use cart::{
    CartEngine, CartLine, CartStoreState, CheckoutDetails, CheckoutError, GeoPoint, LineId,
    OrderDraft, ProductSelection, SelectedExtra,
};
pub use types::*;
