//! Typed cart state machine.
//!
//! One enum per independent activity instead of loose `is_loading` /
//! `is_checking_out` / `error` flags:
//!
//! ```text
//!            begin_fetch              fetch_succeeded
//!   Idle ───────────────► Loading ─────────────────► Loaded
//!     │                      │ fetch_failed            │
//!     │                      ▼                         │ begin_mutation
//!     │                 Failed(msg) ◄──────────┐       ▼
//!     └────────────────────────────────────► Mutating(Add|Remove|Clear)
//!                          mutation_failed ────┘       │ apply_*
//!                                                      ▼
//!                                                   Loaded
//! ```
//!
//! Checkout runs on its own track (`CheckoutPhase`) so the cart keeps
//! rendering while it is in flight.

use crate::cart::{AddedItem, Cart, CartItem, CheckoutReceipt};
use crate::error::{Error, Result};
use crate::key::ItemKey;
use std::fmt;

/// Failure recorded when a caller drops an operation before the server answers.
pub const ABANDONED_MESSAGE: &str = "La operación se interrumpió antes de completarse";

/// Which mutation is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Add,
    Remove,
    Clear,
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mutation::Add => write!(f, "add"),
            Mutation::Remove => write!(f, "remove"),
            Mutation::Clear => write!(f, "clear"),
        }
    }
}

/// Lifecycle of the cart contents.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CartPhase {
    /// Nothing fetched yet.
    #[default]
    Idle,
    Loading,
    Loaded,
    Mutating(Mutation),
    /// Last operation failed; the cart keeps its previous contents.
    Failed(String),
}

/// Lifecycle of a checkout.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CheckoutPhase {
    #[default]
    Idle,
    InProgress,
    Failed(String),
}

/// Everything a cart drawer needs to render.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CartState {
    pub cart: Cart,
    pub phase: CartPhase,
    pub checkout: CheckoutPhase,
    /// Drawer visibility.
    pub is_open: bool,
    /// Set by a successful checkout, consumed once by the success toast.
    pub checkout_success: Option<CheckoutReceipt>,
}

impl CartState {
    /// Fetch or mutation in flight.
    pub fn is_loading(&self) -> bool {
        matches!(self.phase, CartPhase::Loading | CartPhase::Mutating(_))
    }

    pub fn is_checking_out(&self) -> bool {
        self.checkout == CheckoutPhase::InProgress
    }

    /// Whether a new mutation or checkout would be rejected.
    pub fn is_busy(&self) -> bool {
        matches!(self.phase, CartPhase::Mutating(_)) || self.is_checking_out()
    }

    /// Latest error, checkout errors first.
    pub fn error(&self) -> Option<&str> {
        match (&self.checkout, &self.phase) {
            (CheckoutPhase::Failed(msg), _) => Some(msg),
            (_, CartPhase::Failed(msg)) => Some(msg),
            _ => None,
        }
    }

    pub fn is_in_cart(&self, key: &ItemKey) -> bool {
        self.cart.contains(key)
    }

    pub(crate) fn begin_fetch(&mut self) {
        if !matches!(self.phase, CartPhase::Mutating(_)) {
            self.phase = CartPhase::Loading;
        }
    }

    pub(crate) fn fetch_succeeded(&mut self, mut cart: Cart) {
        cart.normalize();
        self.cart = cart;
        if !matches!(self.phase, CartPhase::Mutating(_)) {
            self.phase = CartPhase::Loaded;
        }
    }

    pub(crate) fn fetch_failed(&mut self, message: String) {
        if !matches!(self.phase, CartPhase::Mutating(_)) {
            self.phase = CartPhase::Failed(message);
        }
    }

    pub(crate) fn begin_mutation(&mut self, mutation: Mutation) -> Result<()> {
        if self.is_busy() {
            return Err(Error::Busy);
        }
        self.phase = CartPhase::Mutating(mutation);
        if matches!(self.checkout, CheckoutPhase::Failed(_)) {
            self.checkout = CheckoutPhase::Idle;
        }
        Ok(())
    }

    /// Append the returned row; the server decides totals and deadline.
    pub(crate) fn apply_added(&mut self, added: AddedItem) -> CartItem {
        let item = added.cart_item;
        self.cart.items.push(item.clone());
        self.cart.total_amount = added.total_amount;
        self.cart.expires_at = added.expires_at;
        self.cart.normalize();
        self.phase = CartPhase::Loaded;
        self.is_open = true;
        item
    }

    /// Drop the row locally and adopt the server's totals.
    pub(crate) fn apply_removed(&mut self, item_id: &str, server: Cart) {
        self.cart.items.retain(|item| item.id != item_id);
        self.cart.total_amount = server.total_amount;
        self.cart.expires_at = server.expires_at;
        self.cart.normalize();
        self.phase = CartPhase::Loaded;
    }

    pub(crate) fn apply_cleared(&mut self) {
        self.cart = Cart::default();
        self.phase = CartPhase::Loaded;
    }

    /// Mutation accepted by the server; contents arrive with the refetch.
    pub(crate) fn mutation_pending_refetch(&mut self, mutation: Mutation) {
        if mutation == Mutation::Add {
            self.is_open = true;
        }
        self.phase = CartPhase::Loading;
    }

    pub(crate) fn mutation_failed(&mut self, message: String) {
        self.phase = CartPhase::Failed(message);
    }

    /// The caller gave up on a mutation before the server answered.
    ///
    /// The server may or may not have applied it, so the cart is left as is
    /// and the phase records the failure. Returns whether anything changed.
    pub(crate) fn mutation_abandoned(&mut self) -> bool {
        if !matches!(self.phase, CartPhase::Mutating(_)) {
            return false;
        }
        self.phase = CartPhase::Failed(ABANDONED_MESSAGE.to_string());
        true
    }

    pub(crate) fn begin_checkout(&mut self) -> Result<()> {
        if self.is_busy() {
            return Err(Error::Busy);
        }
        self.checkout = CheckoutPhase::InProgress;
        self.checkout_success = None;
        Ok(())
    }

    pub(crate) fn checkout_succeeded(&mut self, receipt: CheckoutReceipt) {
        self.cart = Cart::default();
        self.phase = CartPhase::Loaded;
        self.checkout = CheckoutPhase::Idle;
        self.checkout_success = Some(receipt);
        self.is_open = false;
    }

    pub(crate) fn checkout_failed(&mut self, message: String) {
        self.checkout = CheckoutPhase::Failed(message);
    }

    pub(crate) fn checkout_abandoned(&mut self) -> bool {
        if self.checkout != CheckoutPhase::InProgress {
            return false;
        }
        self.checkout = CheckoutPhase::Failed(ABANDONED_MESSAGE.to_string());
        true
    }

    pub(crate) fn take_checkout_success(&mut self) -> Option<CheckoutReceipt> {
        self.checkout_success.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::{ItemStatus, ProductType};
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    fn row(id: &str, product_id: &str, price: i64) -> CartItem {
        CartItem {
            id: id.to_string(),
            product_type: ProductType::Profile,
            product_id: product_id.to_string(),
            product_name: format!("Perfil {}", product_id),
            price: Decimal::from(price),
            status: ItemStatus::Reserved,
        }
    }

    fn added(id: &str, product_id: &str, total: i64) -> AddedItem {
        AddedItem {
            cart_item: row(id, product_id, 100),
            total_amount: Decimal::from(total),
            expires_at: Some(Utc::now() + Duration::minutes(10)),
        }
    }

    #[test]
    fn test_fetch_transitions() {
        let mut state = CartState::default();
        assert_eq!(state.phase, CartPhase::Idle);

        state.begin_fetch();
        assert!(state.is_loading());

        state.fetch_succeeded(Cart::default());
        assert_eq!(state.phase, CartPhase::Loaded);
        assert!(state.error().is_none());
    }

    #[test]
    fn test_fetch_failure_keeps_cart() {
        let mut state = CartState::default();
        state.fetch_succeeded(Cart {
            items: vec![row("1", "p1", 100)],
            total_amount: Decimal::from(100),
            expires_at: None,
        });

        state.begin_fetch();
        state.fetch_failed("boom".to_string());

        assert_eq!(state.cart.len(), 1);
        assert_eq!(state.error(), Some("boom"));
    }

    #[test]
    fn test_second_mutation_is_rejected() {
        let mut state = CartState::default();
        state.begin_mutation(Mutation::Add).unwrap();

        assert!(matches!(state.begin_mutation(Mutation::Remove), Err(Error::Busy)));
        assert!(matches!(state.begin_checkout(), Err(Error::Busy)));
    }

    #[test]
    fn test_mutation_allowed_while_fetching() {
        let mut state = CartState::default();
        state.begin_fetch();
        assert!(state.begin_mutation(Mutation::Clear).is_ok());
        assert_eq!(state.phase, CartPhase::Mutating(Mutation::Clear));
    }

    #[test]
    fn test_apply_added_opens_drawer() {
        let mut state = CartState::default();
        state.begin_mutation(Mutation::Add).unwrap();
        state.apply_added(added("1", "p1", 100));

        assert!(state.is_open);
        assert_eq!(state.cart.total_amount, Decimal::from(100));
        assert!(state.cart.expires_at.is_some());
        assert!(state.is_in_cart(&ItemKey::new(ProductType::Profile, "p1")));
    }

    #[test]
    fn test_apply_removed_adopts_server_total() {
        let mut state = CartState::default();
        state.apply_added(added("1", "p1", 100));
        state.apply_added(added("2", "p2", 200));

        state.apply_removed(
            "1",
            Cart {
                items: vec![],
                total_amount: Decimal::from(95),
                expires_at: state.cart.expires_at,
            },
        );

        assert_eq!(state.cart.len(), 1);
        assert_eq!(state.cart.total_amount, Decimal::from(95));
    }

    #[test]
    fn test_removing_last_item_clears_deadline() {
        let mut state = CartState::default();
        state.apply_added(added("1", "p1", 100));

        let stale_deadline = state.cart.expires_at;
        state.apply_removed(
            "1",
            Cart {
                items: vec![],
                total_amount: Decimal::ZERO,
                expires_at: stale_deadline,
            },
        );

        assert!(state.cart.is_empty());
        assert!(state.cart.expires_at.is_none());
    }

    #[test]
    fn test_checkout_success_is_taken_once() {
        let mut state = CartState::default();
        state.apply_added(added("1", "p1", 100));
        state.begin_checkout().unwrap();
        assert!(state.is_checking_out());

        state.checkout_succeeded(CheckoutReceipt::default());
        assert!(state.cart.is_empty());
        assert!(!state.is_open);

        assert!(state.take_checkout_success().is_some());
        assert!(state.take_checkout_success().is_none());
    }

    #[test]
    fn test_checkout_failure_keeps_items() {
        let mut state = CartState::default();
        state.apply_added(added("1", "p1", 100));
        state.begin_checkout().unwrap();
        state.checkout_failed("Reserva expirada".to_string());

        assert_eq!(state.cart.len(), 1);
        assert_eq!(state.error(), Some("Reserva expirada"));
        assert!(!state.is_busy());
    }

    #[test]
    fn test_abandoned_mutation_unblocks() {
        let mut state = CartState::default();
        state.apply_added(added("1", "p1", 100));
        assert!(!state.mutation_abandoned());

        state.begin_mutation(Mutation::Remove).unwrap();
        assert!(state.mutation_abandoned());
        assert_eq!(state.error(), Some(ABANDONED_MESSAGE));
        assert_eq!(state.cart.len(), 1);
        assert!(!state.is_busy());
        assert!(state.begin_mutation(Mutation::Clear).is_ok());
    }

    #[test]
    fn test_abandoned_checkout_unblocks() {
        let mut state = CartState::default();
        state.apply_added(added("1", "p1", 100));
        assert!(!state.checkout_abandoned());

        state.begin_checkout().unwrap();
        assert!(state.checkout_abandoned());
        assert_eq!(
            state.checkout,
            CheckoutPhase::Failed(ABANDONED_MESSAGE.to_string())
        );
        assert_eq!(state.cart.len(), 1);
        assert!(!state.is_busy());

        // A checkout that already settled is left alone
        state.checkout_failed("Reserva expirada".to_string());
        assert!(!state.checkout_abandoned());
    }
}
