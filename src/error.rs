//! Error types for cart operations.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type for cart operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Machine-readable error code reported by the cart backend.
///
/// The backend sends it as `code` next to the human readable `message`.
/// Older backends only send the message; see [`ApiErrorCode::classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiErrorCode {
    /// Wallet balance does not cover the purchase.
    InsufficientBalance,
    /// The reservation window of the cart elapsed.
    ReservationExpired,
    /// Product is sold out or no longer offered.
    ProductUnavailable,
    /// Cart item or product does not exist.
    NotFound,
    /// Missing or rejected credentials.
    Unauthorized,
    /// Checkout attempted on an empty cart.
    EmptyCart,
    /// Anything the client does not recognise.
    #[serde(other)]
    Unknown,
}

impl ApiErrorCode {
    /// Resolve the code of a backend failure.
    ///
    /// An explicit code always wins. Without one, the message is matched
    /// for "saldo" and "insuficiente" (case-insensitive), which is how
    /// the backend phrases balance failures.
    pub fn classify(code: Option<ApiErrorCode>, message: &str) -> ApiErrorCode {
        if let Some(code) = code {
            return code;
        }

        let lowered = message.to_lowercase();
        if lowered.contains("saldo") && lowered.contains("insuficiente") {
            ApiErrorCode::InsufficientBalance
        } else {
            ApiErrorCode::Unknown
        }
    }

    /// Map an HTTP status to a code when the body carries none.
    pub fn from_status(status: u16) -> Option<ApiErrorCode> {
        match status {
            401 | 403 => Some(ApiErrorCode::Unauthorized),
            404 => Some(ApiErrorCode::NotFound),
            410 => Some(ApiErrorCode::ReservationExpired),
            _ => None,
        }
    }
}

impl fmt::Display for ApiErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ApiErrorCode::InsufficientBalance => "INSUFFICIENT_BALANCE",
            ApiErrorCode::ReservationExpired => "RESERVATION_EXPIRED",
            ApiErrorCode::ProductUnavailable => "PRODUCT_UNAVAILABLE",
            ApiErrorCode::NotFound => "NOT_FOUND",
            ApiErrorCode::Unauthorized => "UNAUTHORIZED",
            ApiErrorCode::EmptyCart => "EMPTY_CART",
            ApiErrorCode::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

/// Error types for cart operations.
///
/// Every store operation returns `Result<T>`. Failures are terminal for the
/// user action that caused them: nothing is retried.
#[derive(Debug, Clone)]
pub enum Error {
    /// The backend rejected the request.
    ///
    /// `message` is the backend's own wording and is shown to the user
    /// verbatim.
    Api {
        /// Classified failure code
        code: ApiErrorCode,
        /// Message as sent by the backend
        message: String,
    },

    /// Client-side checkout guard: the balance does not cover the total.
    ///
    /// Raised before any network call. The backend re-validates on its own.
    InsufficientBalance {
        /// Balance the customer holds
        available: Decimal,
        /// Cart total
        required: Decimal,
    },

    /// Transport failure (connection refused, DNS, TLS, ...).
    NetworkError(String),

    /// Request exceeded the configured timeout.
    Timeout(String),

    /// Backend response could not be decoded.
    DeserializationError(String),

    /// Input rejected before reaching the backend.
    ValidationError(String),

    /// Invalid or missing configuration.
    ConfigError(String),

    /// Another mutation or checkout is still in flight.
    Busy,

    /// Generic error with custom message.
    Other(String),
}

impl Error {
    /// Build an API error, classifying the code from the message when the
    /// backend sent none.
    pub fn api(code: Option<ApiErrorCode>, message: impl Into<String>) -> Self {
        let message = message.into();
        Error::Api {
            code: ApiErrorCode::classify(code, &message),
            message,
        }
    }

    /// Code of an API error, if this is one.
    pub fn code(&self) -> Option<ApiErrorCode> {
        match self {
            Error::Api { code, .. } => Some(*code),
            Error::InsufficientBalance { .. } => Some(ApiErrorCode::InsufficientBalance),
            _ => None,
        }
    }

    /// True for both the client guard and a backend balance rejection.
    pub fn is_insufficient_balance(&self) -> bool {
        self.code() == Some(ApiErrorCode::InsufficientBalance)
    }

    /// Text shown to the user. Backend messages pass through untouched.
    pub fn user_message(&self) -> String {
        match self {
            Error::Api { message, .. } => message.clone(),
            Error::InsufficientBalance {
                available,
                required,
            } => format!(
                "Tu saldo ({:.2}) no alcanza para el total del carrito ({:.2})",
                available.round_dp(2),
                required.round_dp(2)
            ),
            Error::Busy => "Hay una operación en curso, intenta de nuevo".to_string(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Api { code, message } => write!(f, "API error ({}): {}", code, message),
            Error::InsufficientBalance {
                available,
                required,
            } => write!(
                f,
                "Insufficient balance: available {}, required {}",
                available, required
            ),
            Error::NetworkError(msg) => write!(f, "Network error: {}", msg),
            Error::Timeout(msg) => write!(f, "Timeout: {}", msg),
            Error::DeserializationError(msg) => write!(f, "Deserialization error: {}", msg),
            Error::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            Error::ConfigError(msg) => write!(f, "Config error: {}", msg),
            Error::Busy => write!(f, "Another cart operation is in flight"),
            Error::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ============================================================================
// Conversions from other error types
// ============================================================================

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        if e.is_io() {
            Error::NetworkError(e.to_string())
        } else {
            Error::DeserializationError(e.to_string())
        }
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Timeout(e.to_string())
        } else if e.is_decode() {
            Error::DeserializationError(e.to_string())
        } else {
            Error::NetworkError(e.to_string())
        }
    }
}

impl From<String> for Error {
    fn from(e: String) -> Self {
        Error::Other(e)
    }
}

impl From<&str> for Error {
    fn from(e: &str) -> Self {
        Error::Other(e.to_string())
    }
}
