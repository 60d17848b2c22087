//! HTTP cart backend for the storefront REST API.

use super::CartBackend;
use crate::cart::{AddedItem, Cart, CheckoutReceipt, ProductType};
use crate::config::CartConfig;
use crate::error::{ApiErrorCode, Error, Result};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Success envelope: every endpoint wraps its payload in `data`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

/// Failure body: `{ "message": "...", "code": "..." }`.
#[derive(Debug, Deserialize)]
struct FailureBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<ApiErrorCode>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AddRequest<'a> {
    product_type: ProductType,
    product_id: &'a str,
}

#[derive(Debug, Serialize)]
struct CheckoutRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
}

/// Cart backend speaking to the storefront API over HTTP.
///
/// Endpoints:
///
/// | Operation | Request |
/// |-----------|---------|
/// | fetch | `GET /cart` |
/// | add | `POST /cart/add` |
/// | remove | `DELETE /cart/remove/:id` |
/// | clear | `DELETE /cart/clear` |
/// | checkout | `POST /cart/checkout` |
///
/// # Example
///
/// ```no_run
/// # use cart_kit::backend::{CartBackend, HttpCartBackend};
/// # use cart_kit::config::CartConfig;
/// # async fn example() -> cart_kit::Result<()> {
/// let config = CartConfig::new("https://api.example.com").with_token("jwt");
/// let backend = HttpCartBackend::new(&config)?;
///
/// let cart = backend.fetch().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct HttpCartBackend {
    base_url: String,
    token: Option<String>,
    http: Client,
}

impl HttpCartBackend {
    /// Create a backend from configuration.
    ///
    /// # Errors
    /// Returns `Err` if the HTTP client cannot be built.
    pub fn new(config: &CartConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        info!(
            "✓ HTTP cart backend initialized: {} (timeout: {:?})",
            config.api_base_url, config.request_timeout
        );

        Ok(HttpCartBackend {
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            token: config.api_token.clone(),
            http,
        })
    }

    /// Replace the bearer token, e.g. after a login refresh.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!("» HTTP {} {}", method, url);
        let builder = self.http.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send and unwrap the `data` envelope.
    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = self.send_raw(builder).await?;
        let envelope: Envelope<T> = response.json().await?;
        Ok(envelope.data)
    }

    /// Send and only check the status.
    async fn send_raw(&self, builder: RequestBuilder) -> Result<reqwest::Response> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let error = failure_from_body(status.as_u16(), &body);
        warn!("HTTP request failed with status {}: {}", status, error);
        Err(error)
    }
}

/// Turn a non-2xx response into a typed error.
///
/// Code precedence: explicit `code`, message heuristic, HTTP status.
fn failure_from_body(status: u16, body: &str) -> Error {
    let parsed = serde_json::from_str::<FailureBody>(body).ok();
    let (message, code) = match parsed {
        Some(FailureBody {
            message: Some(message),
            code,
        }) => (message, code),
        Some(FailureBody {
            message: None,
            code,
        }) => (format!("HTTP {}", status), code),
        None if body.trim().is_empty() => (format!("HTTP {}", status), None),
        None => (body.trim().to_string(), None),
    };

    let code = code.or_else(|| match ApiErrorCode::classify(None, &message) {
        ApiErrorCode::Unknown => ApiErrorCode::from_status(status),
        classified => Some(classified),
    });

    Error::api(code, message)
}

impl CartBackend for HttpCartBackend {
    async fn fetch(&self) -> Result<Cart> {
        self.send(self.request(Method::GET, "/cart")).await
    }

    async fn add(&self, product_type: ProductType, product_id: &str) -> Result<AddedItem> {
        let body = AddRequest {
            product_type,
            product_id,
        };
        self.send(self.request(Method::POST, "/cart/add").json(&body))
            .await
    }

    async fn remove(&self, item_id: &str) -> Result<Cart> {
        let path = format!("/cart/remove/{}", item_id);
        self.send(self.request(Method::DELETE, &path)).await
    }

    async fn clear(&self) -> Result<()> {
        self.send_raw(self.request(Method::DELETE, "/cart/clear"))
            .await
            .map(|_| ())
    }

    async fn checkout(&self, email: Option<&str>) -> Result<CheckoutReceipt> {
        let body = CheckoutRequest { email };
        self.send(self.request(Method::POST, "/cart/checkout").json(&body))
            .await
    }

    async fn health_check(&self) -> Result<bool> {
        let response = self.request(Method::GET, "/cart").send().await?;
        Ok(response.status().is_success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_with_code() {
        let err = failure_from_body(
            400,
            r#"{"message":"La reserva expiró","code":"RESERVATION_EXPIRED"}"#,
        );
        assert_eq!(err.code(), Some(ApiErrorCode::ReservationExpired));
        assert_eq!(err.user_message(), "La reserva expiró");
    }

    #[test]
    fn test_failure_message_heuristic_beats_status() {
        let err = failure_from_body(403, r#"{"message":"Saldo insuficiente"}"#);
        assert!(err.is_insufficient_balance());
    }

    #[test]
    fn test_failure_falls_back_to_status() {
        let err = failure_from_body(404, r#"{"message":"No existe"}"#);
        assert_eq!(err.code(), Some(ApiErrorCode::NotFound));
    }

    #[test]
    fn test_failure_non_json_body() {
        let err = failure_from_body(502, "Bad Gateway");
        assert_eq!(err.code(), Some(ApiErrorCode::Unknown));
        assert_eq!(err.user_message(), "Bad Gateway");

        let err = failure_from_body(500, "");
        assert_eq!(err.user_message(), "HTTP 500");
    }

    #[test]
    fn test_base_url_is_normalized() {
        let config = CartConfig::new("http://localhost:3000/api/");
        let backend = HttpCartBackend::new(&config).unwrap();
        assert_eq!(backend.base_url(), "http://localhost:3000/api");
    }
}
