//! Kiosk cart: client-only basket for anonymous visitors of a kiosk.
//!
//! No backend, no reservation, no expiration. Entries are merged by
//! identity (`product_id`, falling back to `id`) and counted by quantity.
//! Checkout hands the basket to the vendor over WhatsApp, see [`whatsapp`].

pub mod whatsapp;

use crate::key::{resolve_identity, KioskKey};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A branded storefront a kiosk cart checks out to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kiosk {
    pub slug: String,
    pub name: String,
    /// Vendor number in any human format, e.g. `+51 987 654 321`.
    pub whatsapp_number: String,
}

/// A product as shown on a kiosk category card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KioskProduct {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    pub name: String,
    pub price: Decimal,
    #[serde(rename = "type")]
    pub product_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl KioskProduct {
    pub fn identity(&self) -> &str {
        resolve_identity(self.product_id.as_deref(), &self.id)
    }
}

/// One basket line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KioskCartItem {
    #[serde(flatten)]
    pub product: KioskProduct,
    pub quantity: u32,
}

impl KioskCartItem {
    pub fn identity(&self) -> &str {
        self.product.identity()
    }

    pub fn line_total(&self) -> Decimal {
        self.product.price * Decimal::from(self.quantity)
    }
}

/// Client-side basket with drawer visibility.
///
/// Invariant: every entry has `quantity >= 1`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KioskCart {
    items: Vec<KioskCartItem>,
    pub is_open: bool,
}

impl KioskCart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[KioskCartItem] {
        &self.items
    }

    pub fn get(&self, key: &KioskKey) -> Option<&KioskCartItem> {
        let identity = key.resolve();
        self.items.iter().find(|item| item.identity() == identity)
    }

    /// Add one unit: bump the matching entry or append a new one.
    pub fn add_item(&mut self, product: KioskProduct) {
        let identity = product.identity();
        match self.items.iter_mut().find(|item| item.identity() == identity) {
            Some(existing) => {
                existing.quantity = existing.quantity.saturating_add(1);
                debug!("Kiosk cart: {} x{}", identity, existing.quantity);
            }
            None => {
                debug!("Kiosk cart: new entry {}", identity);
                self.items.push(KioskCartItem {
                    product,
                    quantity: 1,
                });
            }
        }
    }

    /// Drop the matching entry whatever its quantity.
    pub fn remove_item(&mut self, key: &KioskKey) {
        let identity = key.resolve();
        self.items.retain(|item| item.identity() != identity);
    }

    /// Set the quantity of an entry. Values below one remove it.
    ///
    /// Unknown keys are ignored.
    pub fn update_quantity(&mut self, key: &KioskKey, quantity: i64) {
        let quantity = quantity.max(0);
        if quantity == 0 {
            self.remove_item(key);
            return;
        }

        let identity = key.resolve();
        if let Some(item) = self.items.iter_mut().find(|item| item.identity() == identity) {
            item.quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        }
    }

    pub fn clear_cart(&mut self) {
        self.items.clear();
    }

    pub fn toggle_cart(&mut self) {
        self.is_open = !self.is_open;
    }

    pub fn open_cart(&mut self) {
        self.is_open = true;
    }

    pub fn close_cart(&mut self) {
        self.is_open = false;
    }

    /// Sum of price x quantity over all entries.
    pub fn total_amount(&self) -> Decimal {
        self.items.iter().map(KioskCartItem::line_total).sum()
    }

    /// Units in the basket (badge count).
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(product_id: Option<&str>, id: &str, price: i64) -> KioskProduct {
        KioskProduct {
            id: id.to_string(),
            product_id: product_id.map(str::to_string),
            name: format!("Producto {}", id),
            price: Decimal::from(price),
            product_type: "profile".to_string(),
            image_url: None,
        }
    }

    #[test]
    fn test_add_merges_by_product_id() {
        let mut cart = KioskCart::new();
        cart.add_item(product(Some("a"), "row-1", 100));
        cart.add_item(product(Some("a"), "row-2", 100));
        cart.add_item(product(Some("a"), "row-3", 100));

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.items()[0].quantity, 3);
    }

    #[test]
    fn test_add_without_product_id_uses_id() {
        let mut cart = KioskCart::new();
        cart.add_item(product(None, "x", 10));
        cart.add_item(product(None, "x", 10));
        cart.add_item(product(None, "y", 10));

        assert_eq!(cart.len(), 2);
        assert_eq!(cart.get(&KioskKey::by_id("x")).unwrap().quantity, 2);
    }

    #[test]
    fn test_total_amount() {
        let mut cart = KioskCart::new();
        cart.add_item(product(Some("a"), "a", 100));
        cart.add_item(product(Some("a"), "a", 100));
        cart.add_item(product(Some("b"), "b", 50));

        assert_eq!(cart.total_amount(), Decimal::from(250));
        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn test_update_quantity() {
        let mut cart = KioskCart::new();
        cart.add_item(product(Some("a"), "a", 100));

        cart.update_quantity(&KioskKey::by_product("a"), 4);
        assert_eq!(cart.items()[0].quantity, 4);

        cart.update_quantity(&KioskKey::by_product("missing"), 4);
        assert_eq!(cart.len(), 1);
    }

    #[test]
    fn test_update_to_zero_or_negative_removes() {
        let mut cart = KioskCart::new();
        cart.add_item(product(Some("a"), "a", 100));
        cart.add_item(product(Some("b"), "b", 100));

        cart.update_quantity(&KioskKey::by_product("a"), 0);
        cart.update_quantity(&KioskKey::by_product("b"), -5);

        assert!(cart.is_empty());
    }

    #[test]
    fn test_remove_ignores_quantity() {
        let mut cart = KioskCart::new();
        for _ in 0..5 {
            cart.add_item(product(Some("a"), "a", 100));
        }
        cart.remove_item(&KioskKey::new(Some("a".to_string()), "whatever"));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_visibility() {
        let mut cart = KioskCart::new();
        cart.toggle_cart();
        assert!(cart.is_open);
        cart.close_cart();
        assert!(!cart.is_open);
        cart.open_cart();
        cart.clear_cart();
        assert!(cart.is_open);
    }

    #[test]
    fn test_decode_kiosk_product() {
        let product: KioskProduct = serde_json::from_value(serde_json::json!({
            "id": "row-1",
            "productId": "p-1",
            "name": "Netflix",
            "price": 15.5,
            "type": "profile",
            "imageUrl": "https://cdn.example.com/netflix.png"
        }))
        .unwrap();

        assert_eq!(product.identity(), "p-1");
        assert_eq!(product.price, Decimal::new(155, 1));
    }
}
