//! Remote cart API gateway.
//!
//! # Architecture
//!
//! - [`CartGateway`] is the port the cart store talks to; [`HttpCartGateway`]
//!   is the `reqwest` implementation against the storefront REST API
//! - The remote cart is the source of truth whenever the user is logged in;
//!   every mutating call is followed by a fresh read
//! - Response shapes vary between API versions and are normalized in
//!   [`conversions`] before reaching the cart
//!
//! # Endpoints
//!
//! - `GET cart` - current cart snapshot
//! - `POST cart/item` - upsert a line, quantity 0 removes it
//! - `POST cart/apply-coupon` - apply a coupon code
//! - `POST auth/logout` - clear the server-side session
//!
//! # Example
//!
//! ```rust,ignore
//! use timberline_storefront::api::{CartGateway, CartItemUpdate, HttpCartGateway};
//!
//! let gateway = HttpCartGateway::new(&config.api, auth_gate)?;
//!
//! let cart = gateway.fetch_cart().await?;
//! let cart = gateway
//!     .upsert_item(&CartItemUpdate::new(product_id, 2, None))
//!     .await?;
//! ```

mod client;
pub mod conversions;
pub mod types;

pub use client::HttpCartGateway;
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur when talking to the remote cart API.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The bearer token was rejected.
    #[error("Unauthorized")]
    Unauthorized,

    /// Rate limited by the API.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// No auth token is stored, so the call cannot be authenticated.
    #[error("No auth token available")]
    MissingToken,

    /// Endpoint URL could not be built.
    #[error("Invalid endpoint URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Port for reading and mutating the server-side cart.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CartGateway: Send + Sync {
    /// Fetch the current cart snapshot.
    async fn fetch_cart(&self) -> Result<RemoteCart, GatewayError>;

    /// Set a line's quantity; zero removes the line.
    async fn upsert_item(&self, update: &CartItemUpdate) -> Result<RemoteCart, GatewayError>;

    /// Apply a coupon code and return the discounted cart.
    async fn apply_coupon(&self, code: &str) -> Result<RemoteCart, GatewayError>;
}

/// Port for ending the server-side session.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionEndpoint: Send + Sync {
    /// Ask the server to drop its session so the next request starts clean.
    async fn clear_session(&self) -> Result<(), GatewayError>;
}
