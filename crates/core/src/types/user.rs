//! Authenticated user record and role.

use serde::{Deserialize, Serialize};

use super::{Email, UserId};

/// Role assigned to an account by the remote service.
///
/// The service speaks `user`, `delivery` and `admin` on the wire; the
/// descriptive names are accepted too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Role {
    /// Places orders from the menu.
    #[default]
    #[serde(rename = "user", alias = "customer")]
    Customer,
    /// Delivers accepted orders.
    #[serde(rename = "delivery", alias = "courier")]
    Courier,
    /// Manages products, orders and couriers.
    #[serde(rename = "admin", alias = "operator")]
    Operator,
}

impl Role {
    /// Wire name of the role.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "user",
            Self::Courier => "delivery",
            Self::Operator => "admin",
        }
    }
}

/// The account a credential was issued for.
///
/// Issued by the server on login and replaced only as a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(rename = "_id", alias = "id")]
    pub id: UserId,
    pub name: String,
    pub email: Email,
    #[serde(default)]
    pub role: Role,
    /// Default delivery address, if the user saved one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}
