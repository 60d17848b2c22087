//! High-level cart service for applications.
//!
//! Provides a convenient wrapper around CartStore with Arc for easy sharing.

use crate::backend::CartBackend;
use crate::cart::{CartItem, CheckoutReceipt, ProductType};
use crate::config::CartConfig;
use crate::error::Result;
use crate::notify::CartNotifier;
use crate::state::CartState;
use crate::store::{CartStore, FetchOutcome};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::watch;

/// High-level cart service.
///
/// Wraps `CartStore` in `Arc` so the cart icon, the drawer and the
/// add-to-cart buttons can all hold the same cart.
///
/// # Design
///
/// `CartStore` keeps its state in a watch channel and uses `&self` methods,
/// so it can be shared behind `Arc` without an extra `Mutex`.
///
/// # Example
///
/// ```ignore
/// use cart_kit::{CartService, backend::InMemoryCartBackend, cart::ProductType};
///
/// let cart = CartService::new(InMemoryCartBackend::new("customer-1"));
/// let button = cart.clone(); // Cheap - just Arc increment
///
/// button.add_to_cart(ProductType::Profile, "p1").await?;
/// ```
pub struct CartService<B: CartBackend> {
    store: Arc<CartStore<B>>,
}

impl<B: CartBackend> Clone for CartService<B> {
    fn clone(&self) -> Self {
        CartService {
            store: Arc::clone(&self.store),
        }
    }
}

impl<B: CartBackend> CartService<B> {
    /// Create a new cart service with the given backend.
    pub fn new(backend: B) -> Self {
        CartService {
            store: Arc::new(CartStore::new(backend)),
        }
    }

    /// Create a new cart service with a custom toast sink.
    pub fn with_notifier(backend: B, notifier: Box<dyn CartNotifier>) -> Self {
        CartService {
            store: Arc::new(CartStore::new(backend).with_notifier(notifier)),
        }
    }

    /// Create a service using the reconcile strategy from configuration.
    pub fn from_config(backend: B, config: &CartConfig, notifier: Box<dyn CartNotifier>) -> Self {
        CartService {
            store: Arc::new(
                CartStore::new(backend)
                    .with_notifier(notifier)
                    .with_reconcile(config.reconcile),
            ),
        }
    }

    /// See [`CartStore::fetch_cart`].
    ///
    /// # Errors
    /// Returns the backend error if the response was applied.
    pub async fn fetch_cart(&self) -> Result<FetchOutcome> {
        self.store.fetch_cart().await
    }

    /// See [`CartStore::add_to_cart`].
    ///
    /// # Errors
    /// Returns `Err` on validation, busy or backend failure.
    pub async fn add_to_cart(&self, product_type: ProductType, product_id: &str) -> Result<CartItem> {
        self.store.add_to_cart(product_type, product_id).await
    }

    /// See [`CartStore::remove_from_cart`].
    ///
    /// # Errors
    /// Returns `Err` on busy or backend failure.
    pub async fn remove_from_cart(&self, item_id: &str) -> Result<()> {
        self.store.remove_from_cart(item_id).await
    }

    /// See [`CartStore::clear_cart`].
    ///
    /// # Errors
    /// Returns `Err` on busy or backend failure.
    pub async fn clear_cart(&self) -> Result<()> {
        self.store.clear_cart().await
    }

    /// See [`CartStore::checkout`].
    ///
    /// # Errors
    /// Returns `Err` when the guard, the busy check or the backend rejects.
    pub async fn checkout(&self, balance: Decimal, email: Option<&str>) -> Result<CheckoutReceipt> {
        self.store.checkout(balance, email).await
    }

    pub fn is_in_cart(&self, product_type: ProductType, product_id: &str) -> bool {
        self.store.is_in_cart(product_type, product_id)
    }

    pub fn state(&self) -> CartState {
        self.store.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<CartState> {
        self.store.subscribe()
    }

    /// Get a reference to the underlying store.
    ///
    /// Use this for drawer controls and other store-only methods.
    pub fn store(&self) -> &CartStore<B> {
        &self.store
    }
}
