//! Shopping cart.
//!
//! A cart line is one configured product: base item, optional size and a
//! set of extras. The configuration is part of the line's identity, so
//! adding the same configuration again merges quantities while any
//! different size or extra produces a separate line with its own frozen
//! unit price.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut cart = CartEngine::new();
//! cart.add_line(ProductSelection::new(pizza).with_size(large).with_extra("Cheese"), 1);
//! let line_id = cart.lines()[0].line_id().clone();
//! cart.update_quantity(&line_id, 2);
//! assert_eq!(cart.subtotal(), Price::from_cents(3300));
//! ```

mod checkout;
mod engine;
mod line;

pub use checkout::{CheckoutDetails, CheckoutError, GeoPoint, OrderDraft, OrderDraftItem};
pub use engine::{CartEngine, CartStoreState};
pub use line::{CartLine, LineId, ProductSelection, SelectedExtra};
