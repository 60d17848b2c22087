//! Client configuration.

use crate::error::{Error, Result};
use crate::strategy::ReconcileStrategy;
use std::time::Duration;

/// Default per-request timeout.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Configuration for the cart client.
///
/// Either built in code or read from the environment with
/// [`CartConfig::from_env`]:
///
/// | Variable | Field | Default |
/// |----------|-------|---------|
/// | `CART_API_URL` | `api_base_url` | required |
/// | `CART_API_TOKEN` | `api_token` | none |
/// | `CART_REQUEST_TIMEOUT_SECS` | `request_timeout` | 15 |
/// | `CART_RECONCILE` | `reconcile` | `apply` |
#[derive(Clone, Debug)]
pub struct CartConfig {
    pub api_base_url: String,
    /// Bearer token of the logged-in customer.
    pub api_token: Option<String>,
    pub request_timeout: Duration,
    pub reconcile: ReconcileStrategy,
}

impl Default for CartConfig {
    fn default() -> Self {
        CartConfig {
            api_base_url: "http://localhost:3000/api".to_string(),
            api_token: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            reconcile: ReconcileStrategy::default(),
        }
    }
}

impl CartConfig {
    pub fn new(api_base_url: impl Into<String>) -> Self {
        CartConfig {
            api_base_url: api_base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_reconcile(mut self, strategy: ReconcileStrategy) -> Self {
        self.reconcile = strategy;
        self
    }

    /// Read configuration from the process environment.
    ///
    /// # Errors
    /// Returns `Error::ConfigError` if `CART_API_URL` is missing or a value
    /// cannot be parsed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`CartConfig::from_env`] with a custom variable source.
    ///
    /// # Errors
    /// Returns `Error::ConfigError` on missing or malformed values.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_base_url = lookup("CART_API_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| Error::ConfigError("CART_API_URL is not set".to_string()))?;

        if !api_base_url.starts_with("http://") && !api_base_url.starts_with("https://") {
            return Err(Error::ConfigError(format!(
                "CART_API_URL must be an http(s) URL, got {}",
                api_base_url
            )));
        }

        let request_timeout = match lookup("CART_REQUEST_TIMEOUT_SECS") {
            Some(raw) => {
                let secs = raw.trim().parse::<u64>().map_err(|e| {
                    Error::ConfigError(format!("CART_REQUEST_TIMEOUT_SECS={}: {}", raw, e))
                })?;
                if secs == 0 {
                    return Err(Error::ConfigError(
                        "CART_REQUEST_TIMEOUT_SECS must be positive".to_string(),
                    ));
                }
                Duration::from_secs(secs)
            }
            None => DEFAULT_REQUEST_TIMEOUT,
        };

        let reconcile = match lookup("CART_RECONCILE") {
            Some(raw) => raw.parse()?,
            None => ReconcileStrategy::default(),
        };

        let config = CartConfig {
            api_base_url: api_base_url.trim().to_string(),
            api_token: lookup("CART_API_TOKEN").filter(|token| !token.is_empty()),
            request_timeout,
            reconcile,
        };

        debug!(
            "Cart config loaded: {} (timeout {:?}, reconcile {})",
            config.api_base_url, config.request_timeout, config.reconcile
        );
        Ok(config)
    }
}
