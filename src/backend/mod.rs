//! Cart backend implementations.

use crate::cart::{AddedItem, Cart, CheckoutReceipt, ProductType};
use crate::error::Result;

#[cfg(feature = "http")]
pub mod http;
#[cfg(feature = "inmemory")]
pub mod inmemory;

#[cfg(feature = "http")]
pub use http::HttpCartBackend;
#[cfg(feature = "inmemory")]
pub use inmemory::{InMemoryCartBackend, ProductListing, DEFAULT_RESERVATION_WINDOW};

/// The authority behind a customer's cart.
///
/// The backend prices items, owns the reservation deadline and validates
/// balances. The client only mirrors what it returns.
///
/// Implementations: HTTP (the storefront API), InMemory (simulator).
///
/// **IMPORTANT:** All methods use `&self`. Implementations needing shared
/// state use interior mutability.
///
/// **ASYNC:** All methods are async and must be awaited.
#[allow(async_fn_in_trait)]
pub trait CartBackend: Send + Sync {
    /// Current cart of the session's customer.
    ///
    /// # Errors
    /// Returns `Err` if the backend is unreachable or rejects the request.
    async fn fetch(&self) -> Result<Cart>;

    /// Reserve a product and put it in the cart.
    ///
    /// The first add starts the reservation window.
    ///
    /// # Errors
    /// Returns `Err` with the backend's code, e.g. insufficient balance or
    /// product unavailable.
    async fn add(&self, product_type: ProductType, product_id: &str) -> Result<AddedItem>;

    /// Release one row by its cart item id.
    ///
    /// # Returns
    /// The cart after removal. Callers use its totals and deadline.
    ///
    /// # Errors
    /// Returns `Err` if the row does not exist or the request fails.
    async fn remove(&self, item_id: &str) -> Result<Cart>;

    /// Release every row.
    ///
    /// # Errors
    /// Returns `Err` if the request fails.
    async fn clear(&self) -> Result<()>;

    /// Buy everything in the cart.
    ///
    /// `email` is where the backend sends the delivery, when given.
    ///
    /// # Errors
    /// Returns `Err` on insufficient balance, expired reservation, empty
    /// cart, or transport failure.
    async fn checkout(&self, email: Option<&str>) -> Result<CheckoutReceipt>;

    /// Health check - verify the backend is reachable.
    ///
    /// # Errors
    /// Returns `Err` if the backend is not accessible
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}
