//! Authoritative cart data model, as reported by the backend.

use crate::key::ItemKey;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of digital product the reseller sells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductType {
    Profile,
    Account,
    Combo,
    License,
    Course,
}

impl ProductType {
    pub const ALL: [ProductType; 5] = [
        ProductType::Profile,
        ProductType::Account,
        ProductType::Combo,
        ProductType::License,
        ProductType::Course,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::Profile => "profile",
            ProductType::Account => "account",
            ProductType::Combo => "combo",
            ProductType::License => "license",
            ProductType::Course => "course",
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductType {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProductType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| crate::error::Error::ValidationError(format!("unknown product type: {}", s)))
    }
}

/// Reservation status of a cart row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    /// Held for this customer until the cart expires.
    #[default]
    Reserved,
    Expired,
    Sold,
    /// Any status this client does not know about.
    #[serde(other)]
    Unknown,
}

/// One row of the authoritative cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: String,
    pub product_type: ProductType,
    pub product_id: String,
    #[serde(default)]
    pub product_name: String,
    pub price: Decimal,
    #[serde(default)]
    pub status: ItemStatus,
}

impl CartItem {
    pub fn key(&self) -> ItemKey {
        ItemKey::new(self.product_type, self.product_id.clone())
    }

    /// Only reserved rows count as "already in cart".
    pub fn is_reserved(&self) -> bool {
        self.status == ItemStatus::Reserved
    }
}

/// Server view of the customer's cart.
///
/// `total_amount` always comes from the backend; the client never sums
/// prices itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    #[serde(default)]
    pub items: Vec<CartItem>,
    #[serde(default)]
    pub total_amount: Decimal,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Cart {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether a reserved row for `(product_type, product_id)` exists.
    pub fn contains(&self, key: &ItemKey) -> bool {
        self.items
            .iter()
            .any(|item| item.is_reserved() && item.product_type == key.product_type && item.product_id == key.product_id)
    }

    /// An empty cart carries no reservation deadline.
    pub(crate) fn normalize(&mut self) {
        if self.items.is_empty() {
            self.expires_at = None;
        }
    }
}

/// Response of an add: the new row plus the recomputed totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddedItem {
    pub cart_item: CartItem,
    pub total_amount: Decimal,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// An order created by a successful checkout.
///
/// Only the fields the client reads are typed; the rest (credentials,
/// delivery details) are kept as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_type: Option<ProductType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Checkout result, kept for a one-time success toast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CheckoutReceipt {
    #[serde(default)]
    pub orders: Vec<Order>,
}

impl CheckoutReceipt {
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(id: &str, product_id: &str, status: ItemStatus) -> CartItem {
        CartItem {
            id: id.to_string(),
            product_type: ProductType::Profile,
            product_id: product_id.to_string(),
            product_name: "Netflix 1 perfil".to_string(),
            price: Decimal::from(100),
            status,
        }
    }

    #[test]
    fn test_decode_backend_cart() {
        let cart: Cart = serde_json::from_value(json!({
            "items": [{
                "id": "ci_1",
                "productType": "combo",
                "productId": "c7",
                "productName": "Combo Disney + Max",
                "price": 12.5,
                "status": "reserved"
            }],
            "totalAmount": 12.5,
            "expiresAt": "2026-10-16T12:00:00Z"
        }))
        .unwrap();

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.items[0].product_type, ProductType::Combo);
        assert_eq!(cart.total_amount, Decimal::new(125, 1));
        assert!(cart.expires_at.is_some());
    }

    #[test]
    fn test_unknown_status_decodes() {
        let item: CartItem = serde_json::from_value(json!({
            "id": "ci_1",
            "productType": "account",
            "productId": "a1",
            "price": 3,
            "status": "pending_review"
        }))
        .unwrap();
        assert_eq!(item.status, ItemStatus::Unknown);
        assert!(!item.is_reserved());
    }

    #[test]
    fn test_contains_only_counts_reserved() {
        let cart = Cart {
            items: vec![
                item("1", "p1", ItemStatus::Expired),
                item("2", "p2", ItemStatus::Reserved),
            ],
            total_amount: Decimal::from(200),
            expires_at: None,
        };

        assert!(!cart.contains(&ItemKey::new(ProductType::Profile, "p1")));
        assert!(cart.contains(&ItemKey::new(ProductType::Profile, "p2")));
        assert!(!cart.contains(&ItemKey::new(ProductType::Account, "p2")));
    }

    #[test]
    fn test_normalize_clears_deadline_when_empty() {
        let mut cart = Cart {
            items: vec![],
            total_amount: Decimal::ZERO,
            expires_at: Some(Utc::now()),
        };
        cart.normalize();
        assert!(cart.expires_at.is_none());
    }

    #[test]
    fn test_order_keeps_extra_fields() {
        let order: Order = serde_json::from_value(json!({
            "id": "o1",
            "productName": "Spotify",
            "credentials": { "email": "x@y.z" }
        }))
        .unwrap();
        assert_eq!(order.product_name.as_deref(), Some("Spotify"));
        assert!(order.extra.contains_key("credentials"));
    }

    #[test]
    fn test_product_type_from_str() {
        assert_eq!("course".parse::<ProductType>().unwrap(), ProductType::Course);
        assert!("gadget".parse::<ProductType>().is_err());
    }
}
