//! Ordering from the command line.
//!
//! Each `--item` spec is `product[:size][+extra...]`, using product and size
//! IDs and extra names as `feastly menu` shows them:
//!
//! ```text
//! p1                 product p1, standard size, no extras
//! p1:lg              product p1, size lg
//! p1:lg+Cheese+Olives
//! p1+Cheese          standard size with one extra
//! ```
//!
//! Repeating an identical spec (extras in any order) adds to the same cart line.

use std::str::FromStr;

use feastly_core::{
    CheckoutDetails, MenuItem, OrderStatus, PaymentMethod, ProductId, ProductSelection, SizeId,
};
use feastly_storefront::StorefrontClient;
use thiserror::Error;
use tracing::info;

/// Errors in the order command's own arguments.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderArgsError {
    #[error("Invalid item spec `{0}`: expected product[:size][+extra...]")]
    InvalidItem(String),

    #[error("Unknown product: {0}")]
    UnknownProduct(String),

    #[error("Product {product} has no size {size}")]
    UnknownSize { product: String, size: String },

    #[error("Invalid payment method `{0}`: expected cash or card")]
    InvalidPayment(String),
}

/// Parsed `--item` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemSpec {
    pub product: ProductId,
    pub size: Option<SizeId>,
    pub extras: Vec<String>,
}

impl FromStr for ItemSpec {
    type Err = OrderArgsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || OrderArgsError::InvalidItem(s.to_string());

        let mut parts = s.split('+').map(str::trim);
        let head = parts.next().filter(|h| !h.is_empty()).ok_or_else(invalid)?;
        let extras: Vec<String> = parts.map(str::to_string).collect();
        if extras.iter().any(String::is_empty) {
            return Err(invalid());
        }

        let (product, size) = match head.split_once(':') {
            Some((product, size)) if !product.is_empty() && !size.is_empty() => {
                (product, Some(SizeId::new(size)))
            }
            Some(_) => return Err(invalid()),
            None => (head, None),
        };

        Ok(Self {
            product: ProductId::new(product),
            size,
            extras,
        })
    }
}

impl ItemSpec {
    /// Resolve against the menu into a cart selection.
    ///
    /// # Errors
    ///
    /// Returns an error if the product or size is not on the menu.
    pub fn resolve(&self, menu: &[MenuItem]) -> Result<ProductSelection, OrderArgsError> {
        let product = menu
            .iter()
            .find(|item| item.id == self.product)
            .ok_or_else(|| OrderArgsError::UnknownProduct(self.product.to_string()))?;

        let mut selection = ProductSelection::new(product.clone());
        if let Some(size_id) = &self.size {
            let size = product
                .size(size_id)
                .ok_or_else(|| OrderArgsError::UnknownSize {
                    product: self.product.to_string(),
                    size: size_id.to_string(),
                })?;
            selection = selection.with_size(size.clone());
        }
        for extra in &self.extras {
            if !product.extras.iter().any(|e| &e.name == extra) {
                tracing::warn!(product = %product.id, extra = %extra, "Extra not offered, ignoring its price");
            }
            selection = selection.with_extra(extra.clone());
        }
        Ok(selection)
    }
}

fn parse_payment(s: &str) -> Result<PaymentMethod, OrderArgsError> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .map_err(|_| OrderArgsError::InvalidPayment(s.to_string()))
}

pub struct OrderArgs {
    pub address: String,
    pub items: Vec<String>,
    pub payment: String,
    pub dry_run: bool,
}

/// Fill the cart from item specs and place the order.
///
/// # Errors
///
/// Returns an error for invalid specs, an unknown product or size, a rejected
/// checkout, or a failed request.
#[allow(clippy::print_stdout)]
pub async fn place(
    client: &StorefrontClient,
    args: OrderArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let specs = args
        .items
        .iter()
        .map(|s| s.parse::<ItemSpec>())
        .collect::<Result<Vec<_>, _>>()?;
    let mut details = CheckoutDetails::new(args.address);
    details.payment_method = parse_payment(&args.payment)?;

    let menu = client.menu().await?;
    let cart = client.cart();
    for spec in &specs {
        cart.add_line(spec.resolve(&menu)?, 1);
    }
    cart.set_checkout_panel_open(true);

    for line in cart.lines() {
        let size = line.selected_size().map_or("standard", |s| s.name.as_str());
        let extras: Vec<&str> = line
            .selected_extras()
            .iter()
            .map(|e| e.name.as_str())
            .collect();
        println!(
            "{:>3} x {:<24} {:<10} {:<24} {:>8}",
            line.quantity(),
            line.name(),
            size,
            extras.join(", "),
            line.total_price()
        );
    }
    println!("Subtotal: {}", cart.subtotal());

    if args.dry_run {
        info!("Dry run, order not placed");
        return Ok(());
    }

    let draft = client.place_order(&details).await?;
    info!(
        "Order placed: {} items, total {}",
        draft.items.len(),
        draft.total_amount
    );
    Ok(())
}

/// Print the signed-in customer's orders.
///
/// # Errors
///
/// Returns an error if the history cannot be fetched.
#[allow(clippy::print_stdout)]
pub async fn history(
    client: &StorefrontClient,
    active_only: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let orders = client.my_orders().await?;
    let shown: Vec<_> = orders
        .iter()
        .filter(|order| !active_only || order.status.is_active())
        .collect();

    if shown.is_empty() {
        info!("No orders");
        return Ok(());
    }
    for order in shown {
        println!(
            "{}  {}  {:<11} {:>3} items  {:>8}",
            order.id,
            order.created_at.format("%Y-%m-%d %H:%M"),
            status_label(order.status),
            order.item_count(),
            order.total_amount
        );
    }
    Ok(())
}

const fn status_label(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Pending => "pending",
        OrderStatus::Accepted => "accepted",
        OrderStatus::OnTheWay => "on the way",
        OrderStatus::Delivered => "delivered",
        OrderStatus::Cancelled => "cancelled",
    }
}
