//! Reconciliation strategies: how a mutation response reaches local state.
//!
//! The backend owns the cart. After every successful mutation the client
//! has to bring its copy back in line with the server, and there are two
//! ways to do it:
//!
//! ```
//! use cart_kit::strategy::ReconcileStrategy;
//!
//! // 1. Apply - merge the mutation response into local state (default)
//! let _s = ReconcileStrategy::Apply;
//!
//! // 2. Refetch - discard the response and GET the whole cart again
//! let _s = ReconcileStrategy::Refetch;
//! ```
//!
//! | Strategy | Requests per mutation | Sees changes from other devices |
//! |----------|-----------------------|---------------------------------|
//! | **Apply** | 1 | No, until the next fetch |
//! | **Refetch** | 2 | Yes |
//!
//! Either way the totals come from the server; the client never sums
//! prices on its own.

use std::fmt;
use std::str::FromStr;

/// Strategy enum controlling how mutation results are reconciled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ReconcileStrategy {
    /// **Apply**: use the mutation response.
    ///
    /// - add: append the returned row, adopt total and deadline
    /// - remove: drop the row locally, adopt total and deadline
    /// - clear: reset to empty
    #[default]
    Apply,

    /// **Refetch**: ignore the mutation response and fetch the cart.
    ///
    /// Costs an extra round trip. The refetch goes through the same
    /// last-request-wins guard as any other fetch.
    Refetch,
}

impl fmt::Display for ReconcileStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileStrategy::Apply => write!(f, "Apply"),
            ReconcileStrategy::Refetch => write!(f, "Refetch"),
        }
    }
}

impl FromStr for ReconcileStrategy {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "apply" => Ok(ReconcileStrategy::Apply),
            "refetch" => Ok(ReconcileStrategy::Refetch),
            other => Err(crate::error::Error::ConfigError(format!(
                "unknown reconcile strategy: {}",
                other
            ))),
        }
    }
}
