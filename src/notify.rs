//! User-facing notifications (toasts) raised by cart operations.
//!
//! The store never renders anything itself. It hands a [`Toast`] to a
//! [`CartNotifier`] and the embedding UI decides how to show it.
//!
//! ```ignore
//! use cart_kit::notify::{CartNotifier, Toast};
//!
//! struct Snackbar;
//!
//! impl CartNotifier for Snackbar {
//!     fn notify(&self, toast: &Toast) {
//!         // push into the UI toast queue
//!     }
//! }
//!
//! // let store = CartStore::new(backend).with_notifier(Box::new(Snackbar));
//! ```
//!
//! Default behavior (if not overridden) logs through the `log` crate.
//!
//! # Titles
//!
//! | Situation | Level | Title |
//! |-----------|-------|-------|
//! | Item added | Success | `Agregado al carrito` |
//! | Balance too low (guard or backend) | Error | `Saldo insuficiente` |
//! | Any other add failure | Error | `Error al agregar` |
//! | Checkout done | Success | `Compra exitosa` |
//! | Any other checkout failure | Error | `Error en la compra` |

use crate::error::Error;
use std::sync::{Arc, Mutex};

pub const TITLE_ADDED: &str = "Agregado al carrito";
pub const TITLE_INSUFFICIENT_BALANCE: &str = "Saldo insuficiente";
pub const TITLE_ADD_FAILED: &str = "Error al agregar";
pub const TITLE_REMOVE_FAILED: &str = "Error al quitar";
pub const TITLE_CLEAR_FAILED: &str = "Error al vaciar el carrito";
pub const TITLE_CHECKOUT_DONE: &str = "Compra exitosa";
pub const TITLE_CHECKOUT_FAILED: &str = "Error en la compra";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Success,
    Error,
}

/// A short message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub level: ToastLevel,
    pub title: String,
    pub description: String,
}

impl Toast {
    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Toast {
            level: ToastLevel::Success,
            title: title.into(),
            description: description.into(),
        }
    }

    /// Error toast for a failed operation.
    ///
    /// Balance failures always get the `Saldo insuficiente` title,
    /// whatever operation raised them.
    pub fn from_error(fallback_title: &str, error: &Error) -> Self {
        let title = if error.is_insufficient_balance() {
            TITLE_INSUFFICIENT_BALANCE
        } else {
            fallback_title
        };

        Toast {
            level: ToastLevel::Error,
            title: title.to_string(),
            description: error.user_message(),
        }
    }
}

/// Sink for toasts.
pub trait CartNotifier: Send + Sync {
    fn notify(&self, toast: &Toast) {
        match toast.level {
            ToastLevel::Success => info!("Toast [{}]: {}", toast.title, toast.description),
            ToastLevel::Error => warn!("Toast [{}]: {}", toast.title, toast.description),
        }
    }
}

/// Logs every toast (the trait's default).
#[derive(Clone, Debug, Default)]
pub struct LogNotifier;

impl CartNotifier for LogNotifier {}

/// Swallows every toast.
#[derive(Clone, Debug, Default)]
pub struct NoOpNotifier;

impl CartNotifier for NoOpNotifier {
    fn notify(&self, _toast: &Toast) {}
}

/// Keeps every toast in memory. Clones share the same log.
#[derive(Clone, Debug, Default)]
pub struct ToastRecorder {
    toasts: Arc<Mutex<Vec<Toast>>>,
}

impl ToastRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded toasts, oldest first.
    pub fn toasts(&self) -> Vec<Toast> {
        match self.toasts.lock() {
            Ok(toasts) => toasts.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn last(&self) -> Option<Toast> {
        self.toasts().pop()
    }

    pub fn len(&self) -> usize {
        self.toasts().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CartNotifier for ToastRecorder {
    fn notify(&self, toast: &Toast) {
        debug!("Recording toast [{}]", toast.title);
        match self.toasts.lock() {
            Ok(mut toasts) => toasts.push(toast.clone()),
            Err(poisoned) => poisoned.into_inner().push(toast.clone()),
        }
    }
}
