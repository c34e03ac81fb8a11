//! Cart line identity and pricing.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{MenuItem, Price, ProductId, SizeOption};

/// Size segment used in a line ID when no size was chosen.
const STANDARD_SIZE: &str = "std";

/// Identity of a configured product in the cart.
///
/// Derived from the product, the chosen size and the chosen extras, so two
/// selections with the same configuration always map to the same line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct LineId(String);

impl LineId {
    /// Derive the identity `{product}-{size or "std"}-{extras sorted, "-" joined}`.
    #[must_use]
    pub fn derive(
        product_id: &ProductId,
        size: Option<&SizeOption>,
        extras: &BTreeSet<String>,
    ) -> Self {
        let size = size.map_or(STANDARD_SIZE, |s| s.id.as_str());
        let extras = extras.iter().map(String::as_str).collect::<Vec<_>>().join("-");
        Self(format!("{product_id}-{size}-{extras}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LineId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

/// A product configuration the customer has finalized.
///
/// Built by the caller when a customization dialog closes and handed to
/// [`CartEngine::add_line`](super::CartEngine::add_line) once.
#[derive(Debug, Clone)]
pub struct ProductSelection {
    pub product: MenuItem,
    pub size: Option<SizeOption>,
    /// Names of the chosen extras.
    pub extras: BTreeSet<String>,
}

impl ProductSelection {
    /// Start a selection with no size and no extras.
    #[must_use]
    pub const fn new(product: MenuItem) -> Self {
        Self {
            product,
            size: None,
            extras: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn with_size(mut self, size: SizeOption) -> Self {
        self.size = Some(size);
        self
    }

    #[must_use]
    pub fn with_extra(mut self, name: impl Into<String>) -> Self {
        self.extras.insert(name.into());
        self
    }

    /// The line this selection belongs to.
    #[must_use]
    pub fn line_id(&self) -> LineId {
        LineId::derive(&self.product.id, self.size.as_ref(), &self.extras)
    }

    /// Extras from the product's catalog that were chosen, in catalog order.
    ///
    /// Names the product does not offer are ignored for pricing.
    #[must_use]
    pub fn resolved_extras(&self) -> Vec<SelectedExtra> {
        self.product
            .extras
            .iter()
            .filter(|extra| self.extras.contains(&extra.name))
            .map(|extra| SelectedExtra {
                name: extra.name.clone(),
                price: extra.price,
            })
            .collect()
    }

    /// Base price plus size surcharge plus every resolved extra.
    #[must_use]
    pub fn unit_price(&self) -> Price {
        let size = self.size.as_ref().map_or(Price::ZERO, |s| s.price);
        let extras: Price = self.resolved_extras().iter().map(|e| e.price).sum();
        self.product.base_price + size + extras
    }
}

/// An extra frozen onto a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedExtra {
    pub name: String,
    pub price: Price,
}

/// One configured product in the cart.
///
/// Configuration and unit price are fixed when the line is created; only the
/// quantity changes afterwards, and `total_price` follows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    line_id: LineId,
    product_id: ProductId,
    name: String,
    image: String,
    unit_price: Price,
    selected_size: Option<SizeOption>,
    selected_extras: Vec<SelectedExtra>,
    quantity: u32,
    total_price: Price,
}

impl CartLine {
    pub(crate) fn new(selection: ProductSelection, quantity: u32) -> Self {
        let line_id = selection.line_id();
        let unit_price = selection.unit_price();
        let selected_extras = selection.resolved_extras();
        let ProductSelection { product, size, .. } = selection;

        Self {
            line_id,
            product_id: product.id,
            name: product.name,
            image: product.image,
            unit_price,
            selected_size: size,
            selected_extras,
            quantity,
            total_price: unit_price.times(quantity),
        }
    }

    pub(crate) fn set_quantity(&mut self, quantity: u32) {
        self.quantity = quantity;
        self.total_price = self.unit_price.times(quantity);
    }

    #[must_use]
    pub const fn line_id(&self) -> &LineId {
        &self.line_id
    }

    #[must_use]
    pub const fn product_id(&self) -> &ProductId {
        &self.product_id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn image(&self) -> &str {
        &self.image
    }

    #[must_use]
    pub const fn unit_price(&self) -> Price {
        self.unit_price
    }

    #[must_use]
    pub const fn selected_size(&self) -> Option<&SizeOption> {
        self.selected_size.as_ref()
    }

    #[must_use]
    pub fn selected_extras(&self) -> &[SelectedExtra] {
        &self.selected_extras
    }

    #[must_use]
    pub const fn quantity(&self) -> u32 {
        self.quantity
    }

    #[must_use]
    pub const fn total_price(&self) -> Price {
        self.total_price
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ExtraOption, SizeId};

    fn pizza() -> MenuItem {
        MenuItem {
            id: ProductId::new("p1"),
            category: "pizza".to_string(),
            name: "Margherita".to_string(),
            description: String::new(),
            image: "/img/p1.png".to_string(),
            base_price: Price::from_cents(800),
            sizes: vec![],
            extras: vec![
                ExtraOption {
                    id: None,
                    name: "Olives".to_string(),
                    price: Price::from_cents(50),
                },
                ExtraOption {
                    id: None,
                    name: "Cheese".to_string(),
                    price: Price::from_cents(100),
                },
            ],
        }
    }

    #[test]
    fn test_line_id_without_size_or_extras() {
        let selection = ProductSelection::new(pizza());
        assert_eq!(selection.line_id().as_str(), "p1-std-");
    }

    #[test]
    fn test_line_id_sorts_extras() {
        let large = SizeOption {
            id: SizeId::new("lg"),
            name: "Large".to_string(),
            price: Price::from_cents(200),
        };
        let selection = ProductSelection::new(pizza())
            .with_size(large)
            .with_extra("Olives")
            .with_extra("Cheese");

        assert_eq!(selection.line_id().as_str(), "p1-lg-Cheese-Olives");
    }

    #[test]
    fn test_unknown_extra_is_not_priced() {
        let selection = ProductSelection::new(pizza()).with_extra("Anchovies");

        assert!(selection.resolved_extras().is_empty());
        assert_eq!(selection.unit_price(), Price::from_cents(800));
        assert_eq!(selection.line_id().as_str(), "p1-std-Anchovies");
    }

    #[test]
    fn test_resolved_extras_follow_catalog_order() {
        let selection = ProductSelection::new(pizza())
            .with_extra("Cheese")
            .with_extra("Olives");

        let names: Vec<_> = selection
            .resolved_extras()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, ["Olives", "Cheese"]);
    }
}
