//! In-memory cart backend (default, thread-safe, async).
//!
//! Simulates the storefront API: a shared catalogue with stock, one cart
//! per customer, a reservation window, wallet balances and checkout.
//! Uses DashMap so clones for different customers share one "server".

use super::CartBackend;
use crate::cart::{AddedItem, Cart, CartItem, CheckoutReceipt, ItemStatus, Order, ProductType};
use crate::error::{ApiErrorCode, Error, Result};
use crate::key::ItemKey;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Reservation window the simulator grants on the first add.
pub const DEFAULT_RESERVATION_WINDOW: Duration = Duration::from_secs(10 * 60);

/// A sellable product in the simulated catalogue.
#[derive(Clone, Debug, PartialEq)]
pub struct ProductListing {
    pub product_type: ProductType,
    pub product_id: String,
    pub name: String,
    pub price: Decimal,
    /// Units that can still be reserved.
    pub stock: u32,
}

impl ProductListing {
    pub fn new(
        product_type: ProductType,
        product_id: impl Into<String>,
        name: impl Into<String>,
        price: Decimal,
        stock: u32,
    ) -> Self {
        ProductListing {
            product_type,
            product_id: product_id.into(),
            name: name.into(),
            price,
            stock,
        }
    }

    fn key(&self) -> ItemKey {
        ItemKey::new(self.product_type, self.product_id.clone())
    }
}

/// Server-side state of one customer.
#[derive(Debug, Default)]
struct CustomerRecord {
    items: Vec<CartItem>,
    expires_at: Option<DateTime<Utc>>,
    balance: Decimal,
    orders: Vec<Order>,
}

impl CustomerRecord {
    fn total(&self) -> Decimal {
        self.items.iter().map(|item| item.price).sum()
    }

    fn snapshot(&self) -> Cart {
        Cart {
            items: self.items.clone(),
            total_amount: self.total(),
            expires_at: self.expires_at,
        }
    }
}

/// Thread-safe async cart backend living in memory.
///
/// Each clone is bound to one customer; [`InMemoryCartBackend::for_customer`]
/// returns a handle for another customer on the same simulated server.
///
/// # Example
///
/// ```no_run
/// use cart_kit::backend::{CartBackend, InMemoryCartBackend, ProductListing};
/// use cart_kit::cart::ProductType;
/// use rust_decimal::Decimal;
///
/// #[tokio::main]
/// async fn main() -> cart_kit::Result<()> {
///     let backend = InMemoryCartBackend::new("customer-1")
///         .with_product(ProductListing::new(
///             ProductType::Profile, "p1", "Netflix 1 perfil", Decimal::from(100), 3,
///         ))
///         .with_balance(Decimal::from(500));
///
///     let added = backend.add(ProductType::Profile, "p1").await?;
///     assert_eq!(added.total_amount, Decimal::from(100));
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct InMemoryCartBackend {
    customer: String,
    catalog: Arc<DashMap<ItemKey, ProductListing>>,
    customers: Arc<DashMap<String, CustomerRecord>>,
    reservation_window: Duration,
    error_codes: bool,
    requests: Arc<AtomicUsize>,
}

impl InMemoryCartBackend {
    /// Create a new simulated server with an empty catalogue.
    pub fn new(customer: impl Into<String>) -> Self {
        InMemoryCartBackend {
            customer: customer.into(),
            catalog: Arc::new(DashMap::new()),
            customers: Arc::new(DashMap::new()),
            reservation_window: DEFAULT_RESERVATION_WINDOW,
            error_codes: true,
            requests: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Handle for another customer on the same server.
    pub fn for_customer(&self, customer: impl Into<String>) -> Self {
        InMemoryCartBackend {
            customer: customer.into(),
            ..self.clone()
        }
    }

    pub fn with_product(self, listing: ProductListing) -> Self {
        self.upsert_product(listing);
        self
    }

    pub fn with_balance(self, balance: Decimal) -> Self {
        self.set_balance(balance);
        self
    }

    pub fn with_reservation_window(mut self, window: Duration) -> Self {
        self.reservation_window = window;
        self
    }

    /// Report failures by message only, like older API versions did.
    pub fn without_error_codes(mut self) -> Self {
        self.error_codes = false;
        self
    }

    pub fn upsert_product(&self, listing: ProductListing) {
        debug!("✓ InMemory catalogue upsert {}", listing.key());
        self.catalog.insert(listing.key(), listing);
    }

    pub fn set_balance(&self, balance: Decimal) {
        self.customers
            .entry(self.customer.clone())
            .or_default()
            .balance = balance;
    }

    pub fn balance(&self) -> Decimal {
        self.customers
            .get(&self.customer)
            .map(|record| record.balance)
            .unwrap_or_default()
    }

    /// Units of a product still available for reservation.
    pub fn stock(&self, product_type: ProductType, product_id: &str) -> Option<u32> {
        self.catalog
            .get(&ItemKey::new(product_type, product_id))
            .map(|listing| listing.stock)
    }

    /// Orders bought by this customer so far.
    pub fn orders(&self) -> Vec<Order> {
        self.customers
            .get(&self.customer)
            .map(|record| record.orders.clone())
            .unwrap_or_default()
    }

    /// Move the reservation deadline into the past.
    ///
    /// The next request of this customer sees the cart as expired.
    pub fn expire_reservation(&self) {
        if let Some(mut record) = self.customers.get_mut(&self.customer) {
            if record.expires_at.is_some() {
                record.expires_at = Some(Utc::now() - chrono::Duration::seconds(1));
                debug!("✓ InMemory reservation of {} forced to expire", self.customer);
            }
        }
    }

    /// Number of requests served to any customer.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn failure(&self, code: ApiErrorCode, message: &str) -> Error {
        let code = if self.error_codes { Some(code) } else { None };
        Error::api(code, message)
    }

    fn restock(&self, items: &[CartItem]) {
        for item in items {
            if let Some(mut listing) = self.catalog.get_mut(&item.key()) {
                listing.stock += 1;
            }
        }
    }

    /// Release an elapsed reservation. Returns whether one was released.
    fn sweep_expired(&self, record: &mut CustomerRecord) -> bool {
        let expired = record
            .expires_at
            .is_some_and(|deadline| deadline <= Utc::now());
        if !expired {
            return false;
        }

        let released = std::mem::take(&mut record.items);
        self.restock(&released);
        record.expires_at = None;
        debug!(
            "✓ InMemory reservation of {} expired, released {} item(s)",
            self.customer,
            released.len()
        );
        true
    }

    fn begin_request(&self, operation: &str) {
        self.requests.fetch_add(1, Ordering::SeqCst);
        debug!("» InMemory {} for {}", operation, self.customer);
    }
}

impl CartBackend for InMemoryCartBackend {
    async fn fetch(&self) -> Result<Cart> {
        self.begin_request("fetch");
        let mut record = self.customers.entry(self.customer.clone()).or_default();
        self.sweep_expired(&mut record);
        Ok(record.snapshot())
    }

    async fn add(&self, product_type: ProductType, product_id: &str) -> Result<AddedItem> {
        self.begin_request("add");
        let key = ItemKey::new(product_type, product_id);
        let mut record = self.customers.entry(self.customer.clone()).or_default();
        self.sweep_expired(&mut record);

        // Stock is checked and taken under one catalogue guard.
        let (name, price) = {
            let mut listing = self
                .catalog
                .get_mut(&key)
                .ok_or_else(|| self.failure(ApiErrorCode::NotFound, "Producto no encontrado"))?;

            if listing.stock == 0 {
                return Err(self.failure(
                    ApiErrorCode::ProductUnavailable,
                    "Producto no disponible por el momento",
                ));
            }
            if record.balance < record.total() + listing.price {
                return Err(self.failure(
                    ApiErrorCode::InsufficientBalance,
                    "Saldo insuficiente para reservar este producto",
                ));
            }

            listing.stock -= 1;
            (listing.name.clone(), listing.price)
        };

        let item = CartItem {
            id: Uuid::now_v7().to_string(),
            product_type,
            product_id: product_id.to_string(),
            product_name: name,
            price,
            status: ItemStatus::Reserved,
        };
        record.items.push(item.clone());

        if record.expires_at.is_none() {
            let window = chrono::Duration::from_std(self.reservation_window)
                .map_err(|e| Error::ConfigError(format!("reservation window: {}", e)))?;
            record.expires_at = Some(Utc::now() + window);
        }

        debug!("✓ InMemory reserved {} as {}", key, item.id);
        Ok(AddedItem {
            cart_item: item,
            total_amount: record.total(),
            expires_at: record.expires_at,
        })
    }

    async fn remove(&self, item_id: &str) -> Result<Cart> {
        self.begin_request("remove");
        let mut record = self.customers.entry(self.customer.clone()).or_default();
        self.sweep_expired(&mut record);

        let position = record
            .items
            .iter()
            .position(|item| item.id == item_id)
            .ok_or_else(|| {
                self.failure(ApiErrorCode::NotFound, "El producto no está en el carrito")
            })?;

        let removed = record.items.remove(position);
        self.restock(std::slice::from_ref(&removed));
        if record.items.is_empty() {
            record.expires_at = None;
        }

        Ok(record.snapshot())
    }

    async fn clear(&self) -> Result<()> {
        self.begin_request("clear");
        let mut record = self.customers.entry(self.customer.clone()).or_default();
        let released = std::mem::take(&mut record.items);
        self.restock(&released);
        record.expires_at = None;
        Ok(())
    }

    async fn checkout(&self, email: Option<&str>) -> Result<CheckoutReceipt> {
        self.begin_request("checkout");
        let mut record = self.customers.entry(self.customer.clone()).or_default();

        if self.sweep_expired(&mut record) {
            return Err(self.failure(
                ApiErrorCode::ReservationExpired,
                "La reserva de tu carrito expiró",
            ));
        }
        if record.items.is_empty() {
            return Err(self.failure(ApiErrorCode::EmptyCart, "El carrito está vacío"));
        }

        let total = record.total();
        if record.balance < total {
            return Err(self.failure(
                ApiErrorCode::InsufficientBalance,
                "Saldo insuficiente para completar la compra",
            ));
        }

        record.balance -= total;
        record.expires_at = None;
        let orders: Vec<Order> = std::mem::take(&mut record.items)
            .into_iter()
            .map(|item| {
                let mut extra = serde_json::Map::new();
                if let Some(email) = email {
                    extra.insert("deliveredTo".to_string(), email.into());
                }
                Order {
                    id: Uuid::now_v7().to_string(),
                    product_type: Some(item.product_type),
                    product_id: Some(item.product_id),
                    product_name: Some(item.product_name),
                    price: Some(item.price),
                    status: Some("completed".to_string()),
                    extra,
                }
            })
            .collect();
        record.orders.extend(orders.iter().cloned());

        info!(
            "✓ InMemory checkout for {}: {} order(s), total {}",
            self.customer,
            orders.len(),
            total
        );
        Ok(CheckoutReceipt { orders })
    }
}
