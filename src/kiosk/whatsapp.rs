//! WhatsApp checkout for kiosk carts.
//!
//! The vendor reads the message as-is, so the layout below is effectively a
//! wire format:
//!
//! ```text
//! 🛒 *Nuevo pedido - Kiosko Central*
//!
//! • Netflix 1 perfil x2 - $15.00 = $30.00
//! • Spotify x1 - $5.50 = $5.50
//!
//! 💰 *Total: $35.50*
//! ```
//!
//! Nothing is confirmed back: once the link is handed to a
//! [`LinkLauncher`] the order is out of our hands and the cart stays as it
//! is.

use super::{Kiosk, KioskCart};
use crate::error::{Error, Result};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rust_decimal::{Decimal, RoundingStrategy};

/// Base of the click-to-chat deep link.
pub const WA_ME_BASE: &str = "https://wa.me/";

/// Characters `encodeURIComponent` leaves untouched besides alphanumerics.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Opens a deep link somewhere (browser tab, OS handler, test recorder).
pub trait LinkLauncher {
    /// # Errors
    /// Returns `Err` if the link could not be handed off.
    fn launch(&self, url: &str) -> Result<()>;
}

/// Render the order text for `cart`.
///
/// # Errors
/// Returns `Error::ValidationError` if the cart is empty.
pub fn order_message(kiosk: &Kiosk, cart: &KioskCart) -> Result<String> {
    if cart.is_empty() {
        return Err(Error::ValidationError(
            "Cannot send an empty kiosk order".to_string(),
        ));
    }

    // Line and grand totals come from the rounded unit prices.
    let mut message = format!("🛒 *Nuevo pedido - {}*\n\n", kiosk.name);
    let mut total = Decimal::ZERO;
    for item in cart.items() {
        let price = cents(item.product.price);
        let line = price * Decimal::from(item.quantity);
        total += line;
        message.push_str(&format!(
            "• {} x{} - ${:.2} = ${:.2}\n",
            item.product.name, item.quantity, price, line
        ));
    }
    message.push_str(&format!("\n💰 *Total: ${:.2}*", total));

    Ok(message)
}

/// Round to cents, half away from zero.
fn cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Percent-encode `text` the way browsers encode a URI component.
pub fn encode_component(text: &str) -> String {
    utf8_percent_encode(text, COMPONENT).to_string()
}

/// Keep only the digits of a phone number (`+51 987-654` → `51987654`).
pub fn normalize_number(number: &str) -> String {
    number.chars().filter(char::is_ascii_digit).collect()
}

/// Build the `wa.me` link carrying the order.
///
/// # Errors
/// Returns `Error::ValidationError` if the cart is empty or the kiosk
/// number has no digits.
pub fn checkout_link(kiosk: &Kiosk, cart: &KioskCart) -> Result<String> {
    let number = normalize_number(&kiosk.whatsapp_number);
    if number.is_empty() {
        return Err(Error::ValidationError(format!(
            "Kiosk {} has no usable WhatsApp number",
            kiosk.slug
        )));
    }

    let message = order_message(kiosk, cart)?;
    Ok(format!("{}{}?text={}", WA_ME_BASE, number, encode_component(&message)))
}

/// Build the link and hand it to `launcher`. Returns the launched link.
///
/// # Errors
/// Returns the validation error of [`checkout_link`] or the launcher error.
pub fn send_order<L: LinkLauncher + ?Sized>(
    kiosk: &Kiosk,
    cart: &KioskCart,
    launcher: &L,
) -> Result<String> {
    let link = checkout_link(kiosk, cart)?;
    launcher.launch(&link)?;
    info!(
        "✓ Kiosk order sent to {} ({} units, total {:.2})",
        kiosk.slug,
        cart.item_count(),
        cart.total_amount()
    );
    Ok(link)
}
