//! Order placement and history.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::instrument;

use feastly_core::{
    CheckoutDetails, OrderDraft, OrderId, OrderStatus, PaymentMethod, Price, ProductId,
    SelectedExtra,
};

use crate::client::StorefrontClient;
use crate::error::Result;
use crate::transport::{ApiRequest, Transport};

pub const PLACE_ORDER_PATH: &str = "/orders/create";
pub const MY_ORDERS_PATH: &str = "/orders/my";

/// The product on an order line: a bare ID, or the product document when
/// the service populated it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum OrderProduct {
    Id(ProductId),
    Detailed {
        #[serde(rename = "_id", alias = "id")]
        id: ProductId,
        #[serde(default)]
        name: String,
    },
}

impl OrderProduct {
    #[must_use]
    pub const fn id(&self) -> &ProductId {
        match self {
            Self::Id(id) | Self::Detailed { id, .. } => id,
        }
    }

    /// Product name, if the service populated it.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Detailed { name, .. } if !name.is_empty() => Some(name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product: OrderProduct,
    pub quantity: u32,
    pub total_price: Price,
    #[serde(default)]
    pub extras: Vec<SelectedExtra>,
}

/// An order as listed in the customer's history.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    #[serde(rename = "_id", alias = "id")]
    pub id: OrderId,
    pub status: OrderStatus,
    #[serde(default)]
    pub items: Vec<OrderLine>,
    pub total_amount: Price,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
}

impl OrderSummary {
    /// Units across every line.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|line| u64::from(line.quantity)).sum()
    }
}

impl<T: Transport> StorefrontClient<T> {
    /// Place an order for everything in the cart.
    ///
    /// On success the cart is emptied and the checkout panel closed; on any
    /// failure the cart is left as it was.
    ///
    /// The order covers the cart as it was when this was called, but success
    /// empties the whole cart: lines added while the order request is in
    /// flight are dropped too, without being ordered.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Checkout` if the cart is empty or the address is
    /// blank (nothing is sent), and `ClientError::Session` if the service
    /// rejects the order.
    #[instrument(skip(self, details))]
    pub async fn place_order(&self, details: &CheckoutDetails) -> Result<OrderDraft> {
        let draft = self.cart().draft_order(details)?;
        let body = serde_json::to_value(&draft)?;

        self.send(ApiRequest::post(PLACE_ORDER_PATH).json(body)).await?;

        tracing::info!(
            items = draft.items.len(),
            total = %draft.total_amount,
            "Order placed"
        );
        self.cart().complete_checkout();
        Ok(draft)
    }

    /// The signed-in customer's orders, newest first as the service sends them.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Session` if the request fails and
    /// `ClientError::Decode` if the listing is malformed.
    #[instrument(skip(self))]
    pub async fn my_orders(&self) -> Result<Vec<OrderSummary>> {
        self.fetch(ApiRequest::get(MY_ORDERS_PATH)).await
    }
}
