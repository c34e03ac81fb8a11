//! Menu items and the options a customer can configure on them.

use serde::{Deserialize, Serialize};

use super::{ExtraId, Price, ProductId, SizeId};

/// A size a product can be ordered in, with its surcharge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeOption {
    pub id: SizeId,
    pub name: String,
    pub price: Price,
}

/// An optional extra (topping, sauce, side) with its surcharge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraOption {
    #[serde(default)]
    pub id: Option<ExtraId>,
    pub name: String,
    pub price: Price,
}

/// A product on the menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    #[serde(rename = "_id", alias = "id")]
    pub id: ProductId,
    #[serde(default)]
    pub category: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
    pub base_price: Price,
    #[serde(default)]
    pub sizes: Vec<SizeOption>,
    #[serde(default)]
    pub extras: Vec<ExtraOption>,
}

impl MenuItem {
    /// Find a size by ID.
    #[must_use]
    pub fn size(&self, id: &SizeId) -> Option<&SizeOption> {
        self.sizes.iter().find(|size| &size.id == id)
    }
}

/// Menu items sharing a category, in the order the service listed them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuCategory {
    pub name: String,
    pub items: Vec<MenuItem>,
}

/// Group items by category, keeping categories in first-seen order.
#[must_use]
pub fn group_by_category(items: Vec<MenuItem>) -> Vec<MenuCategory> {
    let mut categories: Vec<MenuCategory> = Vec::new();
    for item in items {
        match categories.iter_mut().find(|c| c.name == item.category) {
            Some(category) => category.items.push(item),
            None => categories.push(MenuCategory {
                name: item.category.clone(),
                items: vec![item],
            }),
        }
    }
    categories
}
