//! Item identity keys.
//!
//! The authoritative cart identifies a product by `(product_type, product_id)`,
//! the kiosk cart by `product_id` falling back to the entry `id`.

use crate::cart::ProductType;
use std::fmt;

/// Identity of a product in the authoritative cart.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemKey {
    pub product_type: ProductType,
    pub product_id: String,
}

impl ItemKey {
    pub fn new(product_type: ProductType, product_id: impl Into<String>) -> Self {
        ItemKey {
            product_type,
            product_id: product_id.into(),
        }
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.product_type, self.product_id)
    }
}

/// Reference to a kiosk cart entry, as sent by the kiosk widgets.
///
/// Resolves to `product_id` when present, otherwise to `id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KioskKey {
    pub product_id: Option<String>,
    pub id: String,
}

impl KioskKey {
    pub fn new(product_id: Option<String>, id: impl Into<String>) -> Self {
        KioskKey {
            product_id,
            id: id.into(),
        }
    }

    /// Key for an entry that only has an `id`.
    pub fn by_id(id: impl Into<String>) -> Self {
        KioskKey::new(None, id)
    }

    /// Key for a catalogue product.
    pub fn by_product(product_id: impl Into<String>) -> Self {
        let product_id = product_id.into();
        KioskKey {
            id: product_id.clone(),
            product_id: Some(product_id),
        }
    }

    pub fn resolve(&self) -> &str {
        resolve_identity(self.product_id.as_deref(), &self.id)
    }
}

/// Identity rule shared by kiosk entries and kiosk keys.
pub(crate) fn resolve_identity<'a>(product_id: Option<&'a str>, id: &'a str) -> &'a str {
    match product_id {
        Some(product_id) if !product_id.is_empty() => product_id,
        _ => id,
    }
}
