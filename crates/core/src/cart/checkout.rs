//! Order draft built from the cart at checkout.

use serde::Serialize;
use thiserror::Error;

use super::engine::CartEngine;
use super::line::SelectedExtra;
use crate::types::{PaymentMethod, Price, ProductId};

/// Reasons a cart cannot be turned into an order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,
    #[error("delivery address is required")]
    MissingAddress,
}

/// A map pin for the delivery address.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// What the customer entered on the checkout panel.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutDetails {
    pub address: String,
    pub payment_method: PaymentMethod,
    pub location: Option<GeoPoint>,
    pub delivery_fee: Price,
}

impl CheckoutDetails {
    /// Cash on delivery to `address`, no pin, no delivery fee.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            payment_method: PaymentMethod::Cash,
            location: None,
            delivery_fee: Price::ZERO,
        }
    }
}

/// One cart line as the order endpoint expects it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraftItem {
    pub product: ProductId,
    pub quantity: u32,
    /// Size name, if one was chosen.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    pub extras: Vec<SelectedExtra>,
    pub total_price: Price,
}

/// Body of an order placement request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
    pub items: Vec<OrderDraftItem>,
    pub payment_method: PaymentMethod,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    pub subtotal: Price,
    pub delivery_fee: Price,
    pub total_amount: Price,
}

impl OrderDraft {
    /// Snapshot the cart into an order.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::EmptyCart` if the cart has no lines and
    /// `CheckoutError::MissingAddress` if the address is blank.
    pub fn from_cart(cart: &CartEngine, details: &CheckoutDetails) -> Result<Self, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let address = details.address.trim();
        if address.is_empty() {
            return Err(CheckoutError::MissingAddress);
        }

        let items = cart
            .lines()
            .iter()
            .map(|line| OrderDraftItem {
                product: line.product_id().clone(),
                quantity: line.quantity(),
                size: line.selected_size().map(|size| size.name.clone()),
                extras: line.selected_extras().to_vec(),
                total_price: line.total_price(),
            })
            .collect();
        let subtotal = cart.subtotal();

        Ok(Self {
            items,
            payment_method: details.payment_method,
            address: address.to_owned(),
            location: details.location,
            subtotal,
            delivery_fee: details.delivery_fee,
            total_amount: subtotal + details.delivery_fee,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::ProductSelection;
    use crate::types::{ExtraOption, MenuItem, SizeId, SizeOption};

    fn cart_with_pizza() -> CartEngine {
        let product = MenuItem {
            id: ProductId::new("p1"),
            category: "pizza".to_string(),
            name: "Margherita".to_string(),
            description: String::new(),
            image: String::new(),
            base_price: Price::from_cents(800),
            sizes: vec![],
            extras: vec![ExtraOption {
                id: None,
                name: "Cheese".to_string(),
                price: Price::from_cents(100),
            }],
        };
        let size = SizeOption {
            id: SizeId::new("lg"),
            name: "Large".to_string(),
            price: Price::from_cents(200),
        };

        let mut cart = CartEngine::new();
        cart.add_line(
            ProductSelection::new(product)
                .with_size(size)
                .with_extra("Cheese"),
            2,
        );
        cart
    }

    #[test]
    fn test_empty_cart_is_rejected() {
        let result = OrderDraft::from_cart(&CartEngine::new(), &CheckoutDetails::new("Main St"));
        assert_eq!(result, Err(CheckoutError::EmptyCart));
    }

    #[test]
    fn test_blank_address_is_rejected() {
        let result = OrderDraft::from_cart(&cart_with_pizza(), &CheckoutDetails::new("   "));
        assert_eq!(result, Err(CheckoutError::MissingAddress));
    }

    #[test]
    fn test_draft_totals_include_delivery_fee() {
        let mut details = CheckoutDetails::new(" 12 Nile St ");
        details.delivery_fee = Price::from_cents(1500);

        let draft = OrderDraft::from_cart(&cart_with_pizza(), &details).unwrap();

        assert_eq!(draft.address, "12 Nile St");
        assert_eq!(draft.subtotal, Price::from_cents(2200));
        assert_eq!(draft.total_amount, Price::from_cents(3700));
        assert_eq!(draft.items[0].size.as_deref(), Some("Large"));
    }

    #[test]
    fn test_draft_wire_shape() {
        let draft =
            OrderDraft::from_cart(&cart_with_pizza(), &CheckoutDetails::new("12 Nile St")).unwrap();
        let json = serde_json::to_value(&draft).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "items": [{
                    "product": "p1",
                    "quantity": 2,
                    "size": "Large",
                    "extras": [{ "name": "Cheese", "price": 1.0 }],
                    "totalPrice": 22.0,
                }],
                "paymentMethod": "cash",
                "address": "12 Nile St",
                "subtotal": 22.0,
                "deliveryFee": 0.0,
                "totalAmount": 22.0,
            })
        );
    }
}
