//! Storefront walk-through against the in-memory server.
//!
//! Reserves products, watches the countdown, hits the checkout guard,
//! buys, then fills a kiosk basket and prints its WhatsApp link.

use cart_kit::backend::{InMemoryCartBackend, ProductListing};
use cart_kit::cart::ProductType;
use cart_kit::key::KioskKey;
use cart_kit::kiosk::whatsapp::{self, LinkLauncher};
use cart_kit::kiosk::{Kiosk, KioskCart, KioskProduct};
use cart_kit::notify::LogNotifier;
use cart_kit::{error::Result, CartService, Countdown};
use rust_decimal::Decimal;
use std::time::Duration;

/// Prints the link instead of opening a browser.
struct PrintLauncher;

impl LinkLauncher for PrintLauncher {
    fn launch(&self, url: &str) -> Result<()> {
        println!("   → {}", url);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Debug)
        .try_init()
        .ok();

    println!("\n=== Cart Kit - Storefront Example ===\n");

    // 1. Simulated storefront server
    println!("1. Starting in-memory storefront...");
    let server = InMemoryCartBackend::new("customer-42")
        .with_product(ProductListing::new(
            ProductType::Profile,
            "netflix-1",
            "Netflix 1 perfil",
            Decimal::new(1500, 2),
            3,
        ))
        .with_product(ProductListing::new(
            ProductType::Combo,
            "max-prime",
            "Combo Max + Prime",
            Decimal::new(2250, 2),
            1,
        ))
        .with_balance(Decimal::from(30))
        .with_reservation_window(Duration::from_secs(4));
    let cart = CartService::with_notifier(server.clone(), Box::new(LogNotifier));
    println!("   ✓ Server ready, wallet balance {}\n", server.balance());

    // 2. Countdown in the drawer
    let _countdown = Countdown::follow(cart.subscribe(), |display| {
        println!("   ⏱  {}", display);
    });

    // 3. Reserve products
    println!("2. Reserving products:");
    cart.fetch_cart().await?;
    let profile = cart.add_to_cart(ProductType::Profile, "netflix-1").await?;
    println!("   ✓ Reserved {} ({})", profile.product_name, profile.id);

    match cart.add_to_cart(ProductType::Combo, "max-prime").await {
        Ok(item) => println!("   ✓ Reserved {}", item.product_name),
        Err(e) => println!("   ✗ {}", e.user_message()),
    }
    tokio::time::sleep(Duration::from_millis(1_500)).await;

    // 4. Checkout guard
    println!("\n3. Checkout with a low balance:");
    if let Err(e) = cart.checkout(Decimal::from(5), None).await {
        println!("   ✓ Blocked before any request: {}", e.user_message());
    }

    // 5. Buy
    println!("\n4. Checkout:");
    let receipt = cart.checkout(server.balance(), Some("me@example.com")).await?;
    println!(
        "   ✓ {} order(s), balance left {}\n",
        receipt.order_count(),
        server.balance()
    );

    // 6. Kiosk basket
    println!("5. Kiosk basket:");
    let kiosk = Kiosk {
        slug: "central".to_string(),
        name: "Kiosko Central".to_string(),
        whatsapp_number: "+51 987 654 321".to_string(),
    };
    let spotify = KioskProduct {
        id: "row-7".to_string(),
        product_id: Some("spotify-1".to_string()),
        name: "Spotify 1 mes".to_string(),
        price: Decimal::new(550, 2),
        product_type: "account".to_string(),
        image_url: None,
    };

    let mut basket = KioskCart::new();
    basket.add_item(spotify.clone());
    basket.add_item(spotify);
    basket.update_quantity(&KioskKey::by_product("spotify-1"), 3);
    println!(
        "   ✓ {} unit(s), total {:.2}",
        basket.item_count(),
        basket.total_amount()
    );
    whatsapp::send_order(&kiosk, &basket, &PrintLauncher)?;

    println!("\n=== Done ===\n");
    Ok(())
}
