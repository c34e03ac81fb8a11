//! Status enums for orders and payments.

use serde::{Deserialize, Serialize};

/// Lifecycle status of an order, as reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Accepted,
    OnTheWay,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Whether the order is still moving through the kitchen or delivery.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Accepted | Self::OnTheWay)
    }
}

/// How the customer pays on delivery.
///
/// Older orders carry `Cash`/`Visa`; new orders are placed with `cash`/`card`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PaymentMethod {
    #[default]
    #[serde(rename = "cash", alias = "Cash")]
    Cash,
    #[serde(rename = "card", alias = "Visa", alias = "visa")]
    Card,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_statuses() {
        assert!(OrderStatus::Pending.is_active());
        assert!(OrderStatus::OnTheWay.is_active());
        assert!(!OrderStatus::Delivered.is_active());
        assert!(!OrderStatus::Cancelled.is_active());
    }

    #[test]
    fn test_status_wire_names() {
        let status: OrderStatus = serde_json::from_str("\"on_the_way\"").unwrap();
        assert_eq!(status, OrderStatus::OnTheWay);
    }

    #[test]
    fn test_legacy_payment_names() {
        let visa: PaymentMethod = serde_json::from_str("\"Visa\"").unwrap();
        assert_eq!(visa, PaymentMethod::Card);
        assert_eq!(serde_json::to_string(&visa).unwrap(), "\"card\"");
    }
}
