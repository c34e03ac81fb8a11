//! Client state shared across operations.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use feastly_core::{
    CartEngine, CartLine, CartStoreState, CheckoutDetails, CheckoutError, LineId, OrderDraft,
    Price, ProductSelection,
};

use crate::session::CredentialStore;

/// Client state shared by every handle on the client.
///
/// This struct is cheaply cloneable via `Arc` and owns the two stores the
/// rest of the client mutates: the credential and the cart.
#[derive(Clone)]
pub struct ClientState {
    inner: Arc<ClientStateInner>,
}

struct ClientStateInner {
    credentials: Arc<CredentialStore>,
    cart: CartStore,
}

impl ClientState {
    #[must_use]
    pub fn new(credentials: Arc<CredentialStore>) -> Self {
        Self {
            inner: Arc::new(ClientStateInner {
                credentials,
                cart: CartStore::default(),
            }),
        }
    }

    #[must_use]
    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.inner.credentials
    }

    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }
}

/// Thread-safe container for a [`CartEngine`].
///
/// Every operation takes the lock for the duration of one engine call, so
/// each mutation is atomic with respect to the others.
#[derive(Debug, Default)]
pub struct CartStore {
    engine: Mutex<CartEngine>,
}

impl CartStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_line(&self, selection: ProductSelection, quantity: u32) {
        let line_id = selection.line_id();
        let mut engine = self.lock();
        engine.add_line(selection, quantity);
        tracing::debug!(
            line_id = %line_id,
            quantity = engine.line(&line_id).map(CartLine::quantity),
            "Cart line added"
        );
    }

    pub fn remove_line(&self, line_id: &LineId) {
        self.lock().remove_line(line_id);
        tracing::debug!(line_id = %line_id, "Cart line removed");
    }

    pub fn update_quantity(&self, line_id: &LineId, delta: i64) {
        self.lock().update_quantity(line_id, delta);
    }

    pub fn clear(&self) {
        self.lock().clear();
        tracing::debug!("Cart cleared");
    }

    pub fn set_checkout_panel_open(&self, open: bool) {
        self.lock().set_checkout_panel_open(open);
    }

    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.lock().subtotal()
    }

    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lock().item_count()
    }

    #[must_use]
    pub fn lines(&self) -> Vec<CartLine> {
        self.lock().lines().to_vec()
    }

    #[must_use]
    pub fn line(&self, line_id: &LineId) -> Option<CartLine> {
        self.lock().line(line_id).cloned()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    #[must_use]
    pub fn checkout_panel_open(&self) -> bool {
        self.lock().checkout_panel_open()
    }

    #[must_use]
    pub fn snapshot(&self) -> CartStoreState {
        self.lock().state().clone()
    }

    /// Build an order from the current cart contents.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError` if the cart is empty or the address is blank.
    pub fn draft_order(&self, details: &CheckoutDetails) -> Result<OrderDraft, CheckoutError> {
        OrderDraft::from_cart(&self.lock(), details)
    }

    /// Empty the cart and close the checkout panel after an order is placed.
    ///
    /// Clears every line, including any added after the order was drafted.
    pub fn complete_checkout(&self) {
        let mut engine = self.lock();
        engine.clear();
        engine.set_checkout_panel_open(false);
        tracing::debug!("Checkout completed, cart reset");
    }

    fn lock(&self) -> MutexGuard<'_, CartEngine> {
        self.engine.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use feastly_core::{MenuItem, ProductId};

    use super::*;

    fn burger() -> MenuItem {
        MenuItem {
            id: ProductId::new("b1"),
            category: "burgers".to_string(),
            name: "Classic".to_string(),
            description: String::new(),
            image: String::new(),
            base_price: Price::from_cents(650),
            sizes: vec![],
            extras: vec![],
        }
    }

    #[test]
    fn test_state_clones_share_the_cart() {
        let state = ClientState::new(Arc::new(CredentialStore::in_memory()));
        let other = state.clone();

        state.cart().add_line(ProductSelection::new(burger()), 2);

        assert_eq!(other.cart().item_count(), 2);
        assert_eq!(other.cart().subtotal(), Price::from_cents(1300));
    }

    #[test]
    fn test_complete_checkout_resets_cart_and_panel() {
        let cart = CartStore::new();
        cart.add_line(ProductSelection::new(burger()), 1);
        cart.set_checkout_panel_open(true);

        cart.complete_checkout();

        assert!(cart.is_empty());
        assert!(!cart.checkout_panel_open());
    }

    #[test]
    fn test_complete_checkout_drops_lines_added_after_draft() {
        let cart = CartStore::new();
        cart.add_line(ProductSelection::new(burger()), 1);
        let draft = cart.draft_order(&CheckoutDetails::new("1 Main St")).unwrap();

        let mut late = burger();
        late.id = ProductId::new("b2");
        cart.add_line(ProductSelection::new(late), 1);
        cart.complete_checkout();

        assert_eq!(draft.items.len(), 1);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_draft_order_rejects_empty_cart() {
        let cart = CartStore::new();
        assert_eq!(
            cart.draft_order(&CheckoutDetails::new("1 Main St")),
            Err(CheckoutError::EmptyCart)
        );
    }

    #[test]
    fn test_concurrent_adds_merge_into_one_line() {
        let cart = Arc::new(CartStore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cart = Arc::clone(&cart);
                std::thread::spawn(move || cart.add_line(ProductSelection::new(burger()), 1))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let lines = cart.lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity(), 8);
        assert_eq!(lines[0].total_price(), Price::from_cents(5200));
    }
}
