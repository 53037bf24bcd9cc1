//! `reqwest` implementation of the cart gateway.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::ExposeSecret;
use serde::Serialize;
use tracing::{debug, instrument};
use url::Url;

use super::types::{ApplyCouponRequest, CartItemUpdate, RemoteCart};
use super::{CartGateway, GatewayError, SessionEndpoint};
use crate::config::ApiConfig;
use crate::services::auth::AuthGate;

/// Characters of an error body kept in logs and error messages.
const BODY_SNIPPET_LEN: usize = 200;

fn snippet(body: &str) -> String {
    body.chars().take(BODY_SNIPPET_LEN).collect()
}

// =============================================================================
// HttpCartGateway
// =============================================================================

/// Client for the storefront cart REST API.
///
/// Every request carries the bearer token currently held by the [`AuthGate`];
/// requests made without a token fail with [`GatewayError::MissingToken`]
/// before touching the network.
#[derive(Clone)]
pub struct HttpCartGateway {
    inner: Arc<HttpCartGatewayInner>,
}

struct HttpCartGatewayInner {
    client: reqwest::Client,
    base_url: Url,
    auth: AuthGate,
}

impl std::fmt::Debug for HttpCartGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCartGateway")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl HttpCartGateway {
    /// Create a new gateway.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ApiConfig, auth: AuthGate) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("timberline-storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(HttpCartGatewayInner {
                client,
                base_url: config.base_url.clone(),
                auth,
            }),
        })
    }

    /// Base URL requests are resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Send an authenticated request and return the raw success body.
    async fn execute<B: Serialize + Sync>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<String, GatewayError> {
        let token = self.inner.auth.token().ok_or(GatewayError::MissingToken)?;
        let url = self.inner.base_url.join(path)?;

        let mut request = self
            .inner
            .client
            .request(method, url)
            .bearer_auth(token.expose_secret())
            .header("Accept", "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            return Err(GatewayError::Unauthorized);
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(GatewayError::RateLimited(retry_after));
        }

        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %snippet(&response_text),
                "Cart API returned non-success status"
            );
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message: snippet(&response_text),
            });
        }

        Ok(response_text)
    }

    /// Send a request whose response is a cart snapshot.
    async fn execute_cart<B: Serialize + Sync>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<RemoteCart, GatewayError> {
        let response_text = self.execute(method, path, body).await?;

        RemoteCart::from_json(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %snippet(&response_text),
                "Failed to parse cart response"
            );
            GatewayError::Parse(e)
        })
    }
}

#[async_trait]
impl CartGateway for HttpCartGateway {
    #[instrument(skip(self))]
    async fn fetch_cart(&self) -> Result<RemoteCart, GatewayError> {
        let cart = self
            .execute_cart::<()>(reqwest::Method::GET, "cart", None)
            .await?;
        debug!(lines = cart.items.len(), "Fetched remote cart");
        Ok(cart)
    }

    #[instrument(skip(self, update), fields(product_id = %update.product_id, quantity = update.quantity))]
    async fn upsert_item(&self, update: &CartItemUpdate) -> Result<RemoteCart, GatewayError> {
        self.execute_cart(reqwest::Method::POST, "cart/item", Some(update))
            .await
    }

    #[instrument(skip(self))]
    async fn apply_coupon(&self, code: &str) -> Result<RemoteCart, GatewayError> {
        let body = ApplyCouponRequest { coupon: code };
        self.execute_cart(reqwest::Method::POST, "cart/apply-coupon", Some(&body))
            .await
    }
}

#[async_trait]
impl SessionEndpoint for HttpCartGateway {
    /// Logout is sent with whatever credentials remain; in the zombie case
    /// there is no token, so the request goes out without one.
    #[instrument(skip(self))]
    async fn clear_session(&self) -> Result<(), GatewayError> {
        let url = self.inner.base_url.join("auth/logout")?;

        let mut request = self.inner.client.post(url);
        if let Some(token) = self.inner.auth.token() {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await?;
        let status = response.status();
        // An already-dead session is what we wanted.
        if status.is_success() || status == StatusCode::UNAUTHORIZED {
            return Ok(());
        }

        let response_text = response.text().await.unwrap_or_default();
        Err(GatewayError::Api {
            status: status.as_u16(),
            message: snippet(&response_text),
        })
    }
}
