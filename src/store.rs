//! Cart store - main entry point for authoritative cart operations.

use crate::backend::CartBackend;
use crate::cart::{CartItem, CheckoutReceipt, ProductType};
use crate::error::{Error, Result};
use crate::key::ItemKey;
use crate::notify::{
    CartNotifier, LogNotifier, Toast, TITLE_ADDED, TITLE_ADD_FAILED, TITLE_CHECKOUT_DONE,
    TITLE_CHECKOUT_FAILED, TITLE_CLEAR_FAILED, TITLE_REMOVE_FAILED,
};
use crate::state::{CartPhase, CartState, Mutation};
use crate::strategy::ReconcileStrategy;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::watch;

/// What happened to a fetch response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The response became the new cart state (or its error did).
    Applied,
    /// A newer fetch or a mutation superseded this response; it was dropped.
    Discarded,
}

/// Which in-flight marker a [`PendingGuard`] owns.
#[derive(Debug, Clone, Copy)]
enum Pending {
    Mutation(Mutation),
    Checkout,
}

/// Clears the in-flight marker if the operation is dropped before the
/// backend answers (timeout, `select!`, aborted task).
///
/// Settled by the store as soon as the backend call returns; from there on
/// the outcome is recorded without another await.
struct PendingGuard<'a> {
    state: &'a watch::Sender<CartState>,
    pending: Pending,
    armed: bool,
}

impl<'a> PendingGuard<'a> {
    fn new(state: &'a watch::Sender<CartState>, pending: Pending) -> Self {
        PendingGuard {
            state,
            pending,
            armed: true,
        }
    }

    fn settle(mut self) {
        self.armed = false;
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let pending = self.pending;
        let reset = self.state.send_if_modified(|s| match pending {
            Pending::Mutation(_) => s.mutation_abandoned(),
            Pending::Checkout => s.checkout_abandoned(),
        });
        if reset {
            match pending {
                Pending::Mutation(mutation) => {
                    warn!("Cart {} dropped before the backend answered", mutation)
                }
                Pending::Checkout => warn!("Checkout dropped before the backend answered"),
            }
        }
    }
}

/// Client-side mirror of the customer's server cart.
///
/// Holds the last state the backend reported and applies every mutation
/// response to it. State lives in a `tokio::sync::watch` channel so any
/// number of views can [`subscribe`](CartStore::subscribe).
///
/// # Ordering
///
/// Every fetch takes a request token. A response is applied only if its
/// token is still the latest one and no mutation is in flight, so
/// overlapping fetches resolve last-request-wins. Mutations supersede all
/// fetches started before they were applied.
///
/// # Example
///
/// ```ignore
/// use cart_kit::{CartStore, backend::InMemoryCartBackend, cart::ProductType};
///
/// let store = CartStore::new(InMemoryCartBackend::new("customer-1"));
/// store.fetch_cart().await?;
/// store.add_to_cart(ProductType::Profile, "p1").await?;
/// assert!(store.is_in_cart(ProductType::Profile, "p1"));
/// ```
pub struct CartStore<B: CartBackend> {
    backend: B,
    state: watch::Sender<CartState>,
    notifier: Box<dyn CartNotifier>,
    reconcile: ReconcileStrategy,
    next_token: AtomicU64,
    latest_fetch: AtomicU64,
}

impl<B: CartBackend> CartStore<B> {
    /// Create a store with an empty, not yet fetched cart.
    pub fn new(backend: B) -> Self {
        let (state, _) = watch::channel(CartState::default());
        CartStore {
            backend,
            state,
            notifier: Box::new(LogNotifier),
            reconcile: ReconcileStrategy::default(),
            next_token: AtomicU64::new(0),
            latest_fetch: AtomicU64::new(0),
        }
    }

    /// Set where toasts go.
    pub fn with_notifier(mut self, notifier: Box<dyn CartNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Set how mutation responses are reconciled.
    pub fn with_reconcile(mut self, strategy: ReconcileStrategy) -> Self {
        self.reconcile = strategy;
        self
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> CartState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<CartState> {
        self.state.subscribe()
    }

    /// Whether a reserved row for the product is in the cart.
    ///
    /// Rows with any other status do not count.
    pub fn is_in_cart(&self, product_type: ProductType, product_id: &str) -> bool {
        self.state
            .borrow()
            .is_in_cart(&ItemKey::new(product_type, product_id))
    }

    /// Replace the local cart with the server's.
    ///
    /// On failure the previous cart stays and the phase becomes `Failed`.
    ///
    /// # Errors
    ///
    /// Returns the backend error if this fetch's response was applied.
    /// A failing fetch that was superseded returns `Ok(Discarded)`.
    pub async fn fetch_cart(&self) -> Result<FetchOutcome> {
        let token = self.issue_token();
        self.latest_fetch.store(token, Ordering::SeqCst);
        self.state.send_modify(|s| s.begin_fetch());
        debug!("» Fetching cart (request #{})", token);

        let timer = Instant::now();
        let result = self.backend.fetch().await;

        let applied = self.state.send_if_modified(|s| {
            if self.latest_fetch.load(Ordering::SeqCst) != token
                || matches!(s.phase, CartPhase::Mutating(_))
            {
                return false;
            }
            match &result {
                Ok(cart) => s.fetch_succeeded(cart.clone()),
                Err(e) => s.fetch_failed(e.user_message()),
            }
            true
        });

        if !applied {
            warn!(
                "Discarding stale cart response (request #{}, {:?})",
                token,
                timer.elapsed()
            );
            return Ok(FetchOutcome::Discarded);
        }

        match result {
            Ok(cart) => {
                info!(
                    "✓ Cart fetched: {} item(s), total {} in {:?}",
                    cart.len(),
                    cart.total_amount,
                    timer.elapsed()
                );
                Ok(FetchOutcome::Applied)
            }
            Err(e) => {
                warn!("Cart fetch failed: {}", e);
                Err(e)
            }
        }
    }

    /// Reserve a product.
    ///
    /// Opens the drawer on success. The client does not dedupe: adding the
    /// same product twice yields two rows if the backend accepts it.
    ///
    /// # Errors
    ///
    /// - `Error::ValidationError`: empty product id
    /// - `Error::Busy`: another mutation or checkout is in flight
    /// - backend errors, also surfaced as a toast (`Saldo insuficiente`
    ///   for balance failures)
    pub async fn add_to_cart(&self, product_type: ProductType, product_id: &str) -> Result<CartItem> {
        if product_id.trim().is_empty() {
            return Err(Error::ValidationError("product id is empty".to_string()));
        }

        let pending = self.begin(Mutation::Add)?;
        debug!("» Adding {}:{} to cart", product_type, product_id);

        let result = self.backend.add(product_type, product_id).await;
        pending.settle();

        match result {
            Ok(added) => {
                let item = added.cart_item.clone();
                self.supersede_fetches();
                match self.reconcile {
                    ReconcileStrategy::Apply => self.state.send_modify(|s| {
                        s.apply_added(added);
                    }),
                    ReconcileStrategy::Refetch => {
                        self.state
                            .send_modify(|s| s.mutation_pending_refetch(Mutation::Add));
                        self.refetch().await;
                    }
                }

                info!("✓ Added {} to cart as {}", item.key(), item.id);
                self.notifier
                    .notify(&Toast::success(TITLE_ADDED, item.product_name.clone()));
                Ok(item)
            }
            Err(e) => Err(self.fail_mutation(TITLE_ADD_FAILED, e)),
        }
    }

    /// Remove one row by its cart item id.
    ///
    /// The total and deadline are taken from the server response, never
    /// recomputed locally.
    ///
    /// # Errors
    ///
    /// `Error::Busy` or the backend error.
    pub async fn remove_from_cart(&self, item_id: &str) -> Result<()> {
        let pending = self.begin(Mutation::Remove)?;
        debug!("» Removing {} from cart", item_id);

        let result = self.backend.remove(item_id).await;
        pending.settle();

        match result {
            Ok(server) => {
                self.supersede_fetches();
                match self.reconcile {
                    ReconcileStrategy::Apply => {
                        self.state.send_modify(|s| s.apply_removed(item_id, server))
                    }
                    ReconcileStrategy::Refetch => {
                        self.state
                            .send_modify(|s| s.mutation_pending_refetch(Mutation::Remove));
                        self.refetch().await;
                    }
                }
                info!("✓ Removed {} from cart", item_id);
                Ok(())
            }
            Err(e) => Err(self.fail_mutation(TITLE_REMOVE_FAILED, e)),
        }
    }

    /// Release every row and reset to an empty cart.
    ///
    /// # Errors
    ///
    /// `Error::Busy` or the backend error.
    pub async fn clear_cart(&self) -> Result<()> {
        let pending = self.begin(Mutation::Clear)?;
        debug!("» Clearing cart");

        let result = self.backend.clear().await;
        pending.settle();

        match result {
            Ok(()) => {
                self.supersede_fetches();
                match self.reconcile {
                    ReconcileStrategy::Apply => self.state.send_modify(|s| s.apply_cleared()),
                    ReconcileStrategy::Refetch => {
                        self.state
                            .send_modify(|s| s.mutation_pending_refetch(Mutation::Clear));
                        self.refetch().await;
                    }
                }
                info!("✓ Cart cleared");
                Ok(())
            }
            Err(e) => Err(self.fail_mutation(TITLE_CLEAR_FAILED, e)),
        }
    }

    /// Buy the cart.
    ///
    /// Before any network call the cart total is checked against `balance`;
    /// if it does not cover it a `Saldo insuficiente` toast is raised and
    /// nothing is sent. The backend validates again on its side.
    ///
    /// On success the cart is emptied, the drawer closes and the receipt is
    /// kept until [`take_checkout_success`](CartStore::take_checkout_success).
    /// On failure the items stay so the user can retry.
    ///
    /// # Errors
    ///
    /// - `Error::ValidationError`: the cart is empty
    /// - `Error::InsufficientBalance`: client-side guard
    /// - `Error::Busy`: another mutation or checkout is in flight
    /// - backend errors
    pub async fn checkout(&self, balance: Decimal, email: Option<&str>) -> Result<CheckoutReceipt> {
        let (total, is_empty) = {
            let state = self.state.borrow();
            (state.cart.total_amount, state.cart.is_empty())
        };

        if is_empty {
            let e = Error::ValidationError("El carrito está vacío".to_string());
            self.notifier.notify(&Toast::from_error(TITLE_CHECKOUT_FAILED, &e));
            return Err(e);
        }

        if balance < total {
            let e = Error::InsufficientBalance {
                available: balance,
                required: total,
            };
            warn!("Checkout blocked locally: {}", e);
            self.notifier.notify(&Toast::from_error(TITLE_CHECKOUT_FAILED, &e));
            return Err(e);
        }

        let mut begun = Ok(());
        self.state.send_if_modified(|s| {
            begun = s.begin_checkout();
            begun.is_ok()
        });
        begun?;
        let pending = PendingGuard::new(&self.state, Pending::Checkout);

        let email = email.map(str::trim).filter(|email| !email.is_empty());
        debug!("» Checking out {} (total {})", email.unwrap_or("-"), total);
        let timer = Instant::now();

        let result = self.backend.checkout(email).await;
        pending.settle();

        match result {
            Ok(receipt) => {
                self.supersede_fetches();
                let count = receipt.order_count();
                self.state
                    .send_modify(|s| s.checkout_succeeded(receipt.clone()));
                info!(
                    "✓ Checkout completed: {} order(s) in {:?}",
                    count,
                    timer.elapsed()
                );
                self.notifier.notify(&Toast::success(
                    TITLE_CHECKOUT_DONE,
                    format!("Se generaron {} pedido(s)", count),
                ));
                Ok(receipt)
            }
            Err(e) => {
                warn!("Checkout failed: {}", e);
                self.state
                    .send_modify(|s| s.checkout_failed(e.user_message()));
                self.notifier.notify(&Toast::from_error(TITLE_CHECKOUT_FAILED, &e));
                Err(e)
            }
        }
    }

    /// Receipt of the last checkout, returned once.
    pub fn take_checkout_success(&self) -> Option<CheckoutReceipt> {
        let mut taken = None;
        self.state.send_if_modified(|s| {
            taken = s.take_checkout_success();
            taken.is_some()
        });
        taken
    }

    pub fn open_cart(&self) {
        self.set_open(true);
    }

    pub fn close_cart(&self) {
        self.set_open(false);
    }

    pub fn toggle_cart(&self) {
        self.state.send_modify(|s| s.is_open = !s.is_open);
    }

    /// Get backend reference (for advanced use).
    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn set_open(&self, open: bool) {
        self.state.send_if_modified(|s| {
            let changed = s.is_open != open;
            s.is_open = open;
            changed
        });
    }

    fn issue_token(&self) -> u64 {
        self.next_token.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Make every fetch issued so far stale.
    fn supersede_fetches(&self) {
        let token = self.issue_token();
        self.latest_fetch.store(token, Ordering::SeqCst);
    }

    fn begin(&self, mutation: Mutation) -> Result<PendingGuard<'_>> {
        let mut begun = Ok(());
        self.state.send_if_modified(|s| {
            begun = s.begin_mutation(mutation);
            begun.is_ok()
        });

        if let Err(e) = begun {
            debug!("Rejecting {}: another operation is in flight", mutation);
            return Err(e);
        }

        self.supersede_fetches();
        Ok(PendingGuard::new(&self.state, Pending::Mutation(mutation)))
    }

    fn fail_mutation(&self, title: &str, error: Error) -> Error {
        warn!("Cart mutation failed: {}", error);
        self.state
            .send_modify(|s| s.mutation_failed(error.user_message()));
        self.notifier.notify(&Toast::from_error(title, &error));
        error
    }

    /// Follow-up fetch for `ReconcileStrategy::Refetch`.
    ///
    /// The mutation already succeeded, so a failing refetch is only
    /// recorded in the state.
    async fn refetch(&self) {
        if let Err(e) = self.fetch_cart().await {
            warn!("Refetch after mutation failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{InMemoryCartBackend, ProductListing};
    use crate::cart::{AddedItem, Cart};
    use crate::notify::{NoOpNotifier, ToastRecorder, TITLE_INSUFFICIENT_BALANCE};
    use crate::state::{CheckoutPhase, ABANDONED_MESSAGE};
    use std::time::Duration;

    fn backend() -> InMemoryCartBackend {
        InMemoryCartBackend::new("c1")
            .with_product(ProductListing::new(
                ProductType::Profile,
                "p1",
                "Netflix 1 perfil",
                Decimal::from(100),
                5,
            ))
            .with_product(ProductListing::new(
                ProductType::Account,
                "a1",
                "Disney+ cuenta completa",
                Decimal::from(60),
                5,
            ))
            .with_balance(Decimal::from(1000))
    }

    /// Takes half a minute to answer an add or a checkout.
    struct StallingBackend(InMemoryCartBackend);

    impl CartBackend for StallingBackend {
        async fn fetch(&self) -> Result<Cart> {
            self.0.fetch().await
        }

        async fn add(&self, product_type: ProductType, product_id: &str) -> Result<AddedItem> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            self.0.add(product_type, product_id).await
        }

        async fn remove(&self, item_id: &str) -> Result<Cart> {
            self.0.remove(item_id).await
        }

        async fn clear(&self) -> Result<()> {
            self.0.clear().await
        }

        async fn checkout(&self, email: Option<&str>) -> Result<CheckoutReceipt> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            self.0.checkout(email).await
        }
    }

    fn store() -> (CartStore<InMemoryCartBackend>, ToastRecorder) {
        let toasts = ToastRecorder::new();
        let store = CartStore::new(backend()).with_notifier(Box::new(toasts.clone()));
        (store, toasts)
    }

    #[tokio::test]
    async fn test_fetch_replaces_cart() {
        let (store, _) = store();
        store
            .backend()
            .add(ProductType::Profile, "p1")
            .await
            .expect("seed add");

        assert_eq!(store.fetch_cart().await.unwrap(), FetchOutcome::Applied);

        let state = store.state();
        assert_eq!(state.cart.len(), 1);
        assert_eq!(state.phase, CartPhase::Loaded);
        assert!(state.cart.expires_at.is_some());
    }

    #[tokio::test]
    async fn test_add_twice_keeps_two_rows() {
        let (store, toasts) = store();

        store.add_to_cart(ProductType::Profile, "p1").await.unwrap();
        assert!(store.is_in_cart(ProductType::Profile, "p1"));
        assert!(store.state().is_open);

        store.add_to_cart(ProductType::Profile, "p1").await.unwrap();
        let state = store.state();
        assert_eq!(state.cart.len(), 2);
        assert_eq!(state.cart.total_amount, Decimal::from(200));
        assert_eq!(toasts.len(), 2);
    }

    #[tokio::test]
    async fn test_add_empty_product_id() {
        let (store, _) = store();
        let err = store.add_to_cart(ProductType::Profile, " ").await.unwrap_err();
        assert!(matches!(err, Error::ValidationError(_)));
        assert_eq!(store.backend().request_count(), 0);
    }

    #[tokio::test]
    async fn test_add_insufficient_balance_toast() {
        let toasts = ToastRecorder::new();
        let store = CartStore::new(backend().with_balance(Decimal::from(10)))
            .with_notifier(Box::new(toasts.clone()));

        let err = store.add_to_cart(ProductType::Profile, "p1").await.unwrap_err();
        assert!(err.is_insufficient_balance());

        let toast = toasts.last().unwrap();
        assert_eq!(toast.title, TITLE_INSUFFICIENT_BALANCE);
        assert_eq!(toast.description, "Saldo insuficiente para reservar este producto");
        assert!(store.state().cart.is_empty());
        assert!(!store.state().is_open);
    }

    #[tokio::test]
    async fn test_remove_adopts_server_total() {
        let (store, _) = store();
        let first = store.add_to_cart(ProductType::Profile, "p1").await.unwrap();
        store.add_to_cart(ProductType::Account, "a1").await.unwrap();

        store.remove_from_cart(&first.id).await.unwrap();

        let state = store.state();
        assert_eq!(state.cart.len(), 1);
        assert_eq!(state.cart.total_amount, Decimal::from(60));
        assert!(!store.is_in_cart(ProductType::Profile, "p1"));
    }

    #[tokio::test]
    async fn test_remove_unknown_item_fails() {
        let (store, toasts) = store();
        store.add_to_cart(ProductType::Profile, "p1").await.unwrap();

        assert!(store.remove_from_cart("missing").await.is_err());
        assert_eq!(store.state().cart.len(), 1);
        assert_eq!(toasts.last().unwrap().title, TITLE_REMOVE_FAILED);
    }

    #[tokio::test]
    async fn test_clear_resets_everything() {
        let (store, _) = store();
        store.add_to_cart(ProductType::Profile, "p1").await.unwrap();

        store.clear_cart().await.unwrap();

        let state = store.state();
        assert!(state.cart.is_empty());
        assert_eq!(state.cart.total_amount, Decimal::ZERO);
        assert!(state.cart.expires_at.is_none());
    }

    #[tokio::test]
    async fn test_checkout_guard_makes_no_request() {
        let (store, toasts) = store();
        store.add_to_cart(ProductType::Profile, "p1").await.unwrap();
        let requests = store.backend().request_count();

        let err = store.checkout(Decimal::from(50), None).await.unwrap_err();

        assert!(matches!(err, Error::InsufficientBalance { .. }));
        assert_eq!(store.backend().request_count(), requests);
        assert_eq!(toasts.last().unwrap().title, TITLE_INSUFFICIENT_BALANCE);
        assert_eq!(store.state().checkout, CheckoutPhase::Idle);
    }

    #[tokio::test]
    async fn test_checkout_empty_cart() {
        let (store, _) = store();
        let err = store.checkout(Decimal::from(50), None).await.unwrap_err();
        assert!(matches!(err, Error::ValidationError(_)));
        assert_eq!(store.backend().request_count(), 0);
    }

    #[tokio::test]
    async fn test_checkout_success() {
        let (store, toasts) = store();
        store.add_to_cart(ProductType::Profile, "p1").await.unwrap();

        let receipt = store
            .checkout(Decimal::from(1000), Some("  buyer@example.com "))
            .await
            .unwrap();
        assert_eq!(receipt.order_count(), 1);

        let state = store.state();
        assert!(state.cart.is_empty());
        assert!(!state.is_open);
        assert_eq!(toasts.last().unwrap().title, TITLE_CHECKOUT_DONE);

        assert_eq!(store.take_checkout_success(), Some(receipt));
        assert!(store.take_checkout_success().is_none());
    }

    #[tokio::test]
    async fn test_checkout_failure_keeps_items() {
        let (store, _) = store();
        store.add_to_cart(ProductType::Profile, "p1").await.unwrap();
        store.backend().set_balance(Decimal::from(20));

        let err = store.checkout(Decimal::from(1000), None).await.unwrap_err();
        assert!(err.is_insufficient_balance());

        let state = store.state();
        assert_eq!(state.cart.len(), 1);
        assert!(matches!(state.checkout, CheckoutPhase::Failed(_)));
    }

    #[tokio::test]
    async fn test_refetch_strategy() {
        let toasts = ToastRecorder::new();
        let store = CartStore::new(backend())
            .with_notifier(Box::new(toasts.clone()))
            .with_reconcile(ReconcileStrategy::Refetch);

        store.add_to_cart(ProductType::Profile, "p1").await.unwrap();

        let state = store.state();
        assert_eq!(state.cart.len(), 1);
        assert_eq!(state.phase, CartPhase::Loaded);
        assert!(state.is_open);
        // add + follow-up fetch
        assert_eq!(store.backend().request_count(), 2);
    }

    #[test]
    fn test_drawer_visibility() {
        let (store, _) = store();
        store.open_cart();
        assert!(store.state().is_open);
        store.toggle_cart();
        assert!(!store.state().is_open);
        store.toggle_cart();
        store.close_cart();
        assert!(!store.state().is_open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_add_releases_store() {
        let store =
            CartStore::new(StallingBackend(backend())).with_notifier(Box::new(NoOpNotifier));

        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            store.add_to_cart(ProductType::Profile, "p1"),
        )
        .await;
        assert!(outcome.is_err());

        let state = store.state();
        assert_eq!(state.phase, CartPhase::Failed(ABANDONED_MESSAGE.to_string()));
        assert!(!state.is_busy());

        store.clear_cart().await.unwrap();
        assert_eq!(store.state().phase, CartPhase::Loaded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_checkout_releases_store() {
        let server = backend();
        server.add(ProductType::Profile, "p1").await.unwrap();
        let store = CartStore::new(StallingBackend(server)).with_notifier(Box::new(NoOpNotifier));
        store.fetch_cart().await.unwrap();

        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            store.checkout(Decimal::from(1000), None),
        )
        .await;
        assert!(outcome.is_err());

        let state = store.state();
        assert_eq!(
            state.checkout,
            CheckoutPhase::Failed(ABANDONED_MESSAGE.to_string())
        );
        assert!(!state.is_busy());
        assert_eq!(state.cart.len(), 1);

        let item_id = state.cart.items[0].id.clone();
        store.remove_from_cart(&item_id).await.unwrap();
        assert!(store.state().cart.is_empty());
    }

    #[tokio::test]
    async fn test_completed_add_leaves_no_abandoned_marker() {
        let (store, _) = store();
        store.add_to_cart(ProductType::Profile, "p1").await.unwrap();
        store.backend().set_balance(Decimal::ZERO);
        store.add_to_cart(ProductType::Account, "a1").await.unwrap_err();

        // The failure is the backend's, not a cancellation
        let state = store.state();
        assert!(matches!(state.phase, CartPhase::Failed(ref msg) if msg != ABANDONED_MESSAGE));
        assert_eq!(state.cart.len(), 1);
    }
}
