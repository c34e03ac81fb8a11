//! Cart store state and the operations allowed on it.

use serde::Serialize;

use super::line::{CartLine, LineId, ProductSelection};
use crate::types::Price;

/// Everything the cart holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartStoreState {
    lines: Vec<CartLine>,
    checkout_panel_open: bool,
}

/// Owns the cart and enforces its rules.
///
/// # Invariants
///
/// - Line IDs are unique.
/// - Every line satisfies `total_price == unit_price * quantity`.
/// - Every line has `quantity >= 1`.
///
/// Operations on unknown line IDs are no-ops, and none of them fail.
#[derive(Debug, Clone, Default)]
pub struct CartEngine {
    state: CartStoreState,
}

impl CartEngine {
    /// Create an empty cart with the checkout panel closed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `quantity` units of a configured product.
    ///
    /// Merges into the existing line when the configuration is already in
    /// the cart, otherwise appends a new line. The caller guarantees
    /// `quantity >= 1`.
    pub fn add_line(&mut self, selection: ProductSelection, quantity: u32) {
        let line_id = selection.line_id();
        if let Some(line) = self.line_mut(&line_id) {
            let merged = line.quantity().saturating_add(quantity);
            line.set_quantity(merged);
            return;
        }
        self.state.lines.push(CartLine::new(selection, quantity));
    }

    /// Drop a line. Unknown IDs are ignored.
    pub fn remove_line(&mut self, line_id: &LineId) {
        self.state.lines.retain(|line| line.line_id() != line_id);
    }

    /// Change a line's quantity by `delta`.
    ///
    /// A change that would leave the quantity at zero or below is ignored;
    /// use [`remove_line`](Self::remove_line) to drop a line.
    pub fn update_quantity(&mut self, line_id: &LineId, delta: i64) {
        let Some(line) = self.line_mut(line_id) else {
            return;
        };
        let Ok(quantity) = u32::try_from(i64::from(line.quantity()).saturating_add(delta)) else {
            return;
        };
        if quantity > 0 {
            line.set_quantity(quantity);
        }
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.state.lines.clear();
    }

    pub fn set_checkout_panel_open(&mut self, open: bool) {
        self.state.checkout_panel_open = open;
    }

    /// Sum of every line's total, recomputed on each call.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.state.lines.iter().map(CartLine::total_price).sum()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.state
            .lines
            .iter()
            .map(|line| u64::from(line.quantity()))
            .sum()
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.state.lines
    }

    #[must_use]
    pub fn line(&self, line_id: &LineId) -> Option<&CartLine> {
        self.state.lines.iter().find(|line| line.line_id() == line_id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lines.is_empty()
    }

    #[must_use]
    pub const fn checkout_panel_open(&self) -> bool {
        self.state.checkout_panel_open
    }

    #[must_use]
    pub const fn state(&self) -> &CartStoreState {
        &self.state
    }

    fn line_mut(&mut self, line_id: &LineId) -> Option<&mut CartLine> {
        self.state
            .lines
            .iter_mut()
            .find(|line| line.line_id() == line_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ExtraOption, MenuItem, ProductId, SizeId, SizeOption};

    fn pizza() -> MenuItem {
        MenuItem {
            id: ProductId::new("p1"),
            category: "pizza".to_string(),
            name: "Margherita".to_string(),
            description: String::new(),
            image: String::new(),
            base_price: Price::from_cents(800),
            sizes: vec![large(), small()],
            extras: vec![
                ExtraOption {
                    id: None,
                    name: "Cheese".to_string(),
                    price: Price::from_cents(100),
                },
                ExtraOption {
                    id: None,
                    name: "Olives".to_string(),
                    price: Price::from_cents(75),
                },
            ],
        }
    }

    fn large() -> SizeOption {
        SizeOption {
            id: SizeId::new("lg"),
            name: "Large".to_string(),
            price: Price::from_cents(200),
        }
    }

    fn small() -> SizeOption {
        SizeOption {
            id: SizeId::new("sm"),
            name: "Small".to_string(),
            price: Price::ZERO,
        }
    }

    fn large_with_cheese() -> ProductSelection {
        ProductSelection::new(pizza())
            .with_size(large())
            .with_extra("Cheese")
    }

    fn assert_totals_consistent(cart: &CartEngine) {
        for line in cart.lines() {
            assert_eq!(
                line.total_price(),
                line.unit_price().times(line.quantity()),
                "line {} drifted",
                line.line_id()
            );
        }
    }

    #[test]
    fn test_large_with_cheese_scenario() {
        let mut cart = CartEngine::new();

        cart.add_line(large_with_cheese(), 1);
        let line = &cart.lines()[0];
        assert_eq!(line.unit_price(), Price::from_cents(1100));
        assert_eq!(line.total_price(), Price::from_cents(1100));

        cart.add_line(large_with_cheese(), 2);
        assert_eq!(cart.lines().len(), 1);
        let line = &cart.lines()[0];
        assert_eq!(line.quantity(), 3);
        assert_eq!(line.total_price(), Price::from_cents(3300));
    }

    #[test]
    fn test_same_configuration_in_any_order_merges() {
        let mut cart = CartEngine::new();
        cart.add_line(
            ProductSelection::new(pizza())
                .with_extra("Olives")
                .with_extra("Cheese"),
            2,
        );
        cart.add_line(
            ProductSelection::new(pizza())
                .with_extra("Cheese")
                .with_extra("Olives"),
            5,
        );

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity(), 7);
        assert_totals_consistent(&cart);
    }

    #[test]
    fn test_different_configuration_splits() {
        let mut cart = CartEngine::new();
        cart.add_line(large_with_cheese(), 1);
        cart.add_line(ProductSelection::new(pizza()).with_size(small()), 1);
        cart.add_line(ProductSelection::new(pizza()).with_size(large()), 1);

        assert_eq!(cart.lines().len(), 3);
        let prices: Vec<_> = cart.lines().iter().map(CartLine::unit_price).collect();
        assert_eq!(
            prices,
            [
                Price::from_cents(1100),
                Price::from_cents(800),
                Price::from_cents(1000)
            ]
        );
    }

    #[test]
    fn test_update_quantity_keeps_totals() {
        let mut cart = CartEngine::new();
        cart.add_line(large_with_cheese(), 1);
        let id = cart.lines()[0].line_id().clone();

        cart.update_quantity(&id, 4);
        assert_eq!(cart.lines()[0].quantity(), 5);
        cart.update_quantity(&id, -2);
        assert_eq!(cart.lines()[0].quantity(), 3);
        assert_totals_consistent(&cart);
    }

    #[test]
    fn test_quantity_floor_rejects_underflow() {
        let mut cart = CartEngine::new();
        cart.add_line(large_with_cheese(), 2);
        let id = cart.lines()[0].line_id().clone();

        cart.update_quantity(&id, -2);
        assert_eq!(cart.lines()[0].quantity(), 2);
        cart.update_quantity(&id, -10);
        assert_eq!(cart.lines()[0].quantity(), 2);
        assert_eq!(cart.lines()[0].total_price(), Price::from_cents(2200));
    }

    #[test]
    fn test_unknown_line_is_noop() {
        let mut cart = CartEngine::new();
        cart.add_line(large_with_cheese(), 1);
        let before = cart.state().clone();

        let missing = LineId::from("nope-std-");
        cart.update_quantity(&missing, 3);
        cart.remove_line(&missing);

        assert_eq!(cart.state(), &before);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut cart = CartEngine::new();
        cart.add_line(large_with_cheese(), 1);
        let id = cart.lines()[0].line_id().clone();

        cart.remove_line(&id);
        cart.remove_line(&id);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_subtotal_and_item_count_follow_lines() {
        let mut cart = CartEngine::new();
        cart.add_line(large_with_cheese(), 2);
        cart.add_line(ProductSelection::new(pizza()).with_extra("Olives"), 1);
        assert_eq!(cart.subtotal(), Price::from_cents(2200 + 875));
        assert_eq!(cart.item_count(), 3);

        let id = cart.lines()[0].line_id().clone();
        cart.remove_line(&id);
        assert_eq!(cart.subtotal(), Price::from_cents(875));

        cart.clear();
        assert_eq!(cart.subtotal(), Price::ZERO);
        assert_eq!(cart.item_count(), 0);
    }

    #[test]
    fn test_checkout_panel_toggle_does_not_touch_lines() {
        let mut cart = CartEngine::new();
        cart.add_line(large_with_cheese(), 1);

        cart.set_checkout_panel_open(true);
        assert!(cart.checkout_panel_open());
        assert_eq!(cart.subtotal(), Price::from_cents(1100));

        cart.set_checkout_panel_open(false);
        assert!(!cart.checkout_panel_open());
    }
}
