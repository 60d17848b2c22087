//! # cart-kit
//!
//! A typed shopping-cart client for a digital-goods storefront.
//!
//! ## Features
//!
//! - **Server-Reserved Cart:** The backend owns items, totals and the reservation deadline
//! - **Backend Agnostic:** HTTP backend, in-memory simulator, or your own `CartBackend`
//! - **Race Safe:** Stale fetch responses are discarded, mutations never interleave
//! - **Countdown:** Owned timer handle rendering `m:ss` until the reservation expires
//! - **Kiosk Cart:** Client-only basket with quantity merging and WhatsApp checkout
//! - **Typed Errors:** Backend failures carry an `ApiErrorCode`, not a string match
//!
//! ## Quick Start
//!
//! ### Reserved Cart (Logged-in Customers)
//!
//! Use [`CartService`] so every widget shares the same cart:
//!
//! ```ignore
//! use cart_kit::{
//!     CartConfig, CartService,
//!     backend::HttpCartBackend,
//!     cart::ProductType,
//!     notify::LogNotifier,
//! };
//! use rust_decimal::Decimal;
//!
//! // 1. Configure from CART_API_URL / CART_API_TOKEN
//! let config = CartConfig::from_env()?;
//!
//! // 2. Create the service
//! let backend = HttpCartBackend::new(&config)?;
//! let cart = CartService::from_config(backend, &config, Box::new(LogNotifier));
//!
//! // 3. Use it - CartService is Clone for sharing between widgets
//! let button = cart.clone();
//! cart.fetch_cart().await?;
//! button.add_to_cart(ProductType::Profile, "netflix-1").await?;
//!
//! // 4. Checkout against the wallet balance
//! let receipt = cart.checkout(Decimal::from(120), Some("me@example.com")).await?;
//! ```
//!
//! ### Kiosk Cart (Anonymous Visitors)
//!
//! ```ignore
//! use cart_kit::kiosk::{whatsapp, Kiosk, KioskCart};
//!
//! let mut basket = KioskCart::new();
//! basket.add_item(product);
//! let link = whatsapp::checkout_link(&kiosk, &basket)?;
//! ```

#[macro_use]
extern crate log;

pub mod backend;
pub mod cart;
pub mod config;
pub mod countdown;
pub mod error;
pub mod key;
pub mod kiosk;
pub mod notify;
pub mod service;
pub mod state;
pub mod store;
pub mod strategy;

// Re-exports for convenience
pub use backend::CartBackend;
pub use cart::{Cart, CartItem, ProductType};
pub use config::CartConfig;
pub use countdown::{Countdown, CountdownDisplay};
pub use error::{ApiErrorCode, Error, Result};
pub use kiosk::KioskCart;
pub use notify::{CartNotifier, Toast};
pub use service::CartService;
pub use state::CartState;
pub use store::{CartStore, FetchOutcome};
pub use strategy::ReconcileStrategy;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
