//! Wire types for the remote cart API.
//!
//! These mirror the JSON the API returns, including its inconsistencies:
//! carts may arrive wrapped in a `data` envelope or bare, ids may be numbers
//! or strings, and the price may sit on the line, on the product, or inside a
//! nested price block. See [`super::conversions`] for the normalization into
//! [`timberline_core::CartLineItem`].

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use timberline_core::{ProductId, SpecificationId};

// =============================================================================
// Request Types
// =============================================================================

/// Body of `POST cart/item`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartItemUpdate {
    /// Product to upsert.
    pub product_id: ProductId,
    /// Absolute quantity; zero removes the line.
    pub quantity: u32,
    /// Selected specification, if the product has variants.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specification_id: Option<SpecificationId>,
}

impl CartItemUpdate {
    /// Create an upsert request.
    #[must_use]
    pub const fn new(
        product_id: ProductId,
        quantity: u32,
        specification_id: Option<SpecificationId>,
    ) -> Self {
        Self {
            product_id,
            quantity,
            specification_id,
        }
    }

    /// Create a request removing the product's line.
    #[must_use]
    pub const fn remove(product_id: ProductId) -> Self {
        Self::new(product_id, 0, None)
    }
}

/// Body of `POST cart/apply-coupon`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplyCouponRequest<'a> {
    /// Coupon code as entered by the customer.
    pub coupon: &'a str,
}

// =============================================================================
// Response Types
// =============================================================================

/// Server-side cart snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RemoteCart {
    /// Cart lines.
    #[serde(default, alias = "cart_items")]
    pub items: Vec<RemoteCartLine>,
    /// Coupon code applied to the cart.
    #[serde(default, alias = "coupon_code")]
    pub coupon: Option<String>,
    /// Discount granted by the coupon.
    #[serde(default, alias = "discount_amount")]
    pub discount: Option<Decimal>,
}

impl RemoteCart {
    /// Parse a response body, unwrapping an optional `data` envelope.
    ///
    /// `{"data": null}` is an empty cart.
    ///
    /// # Errors
    ///
    /// Returns `serde_json::Error` if the body is not a cart.
    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        let mut value: serde_json::Value = serde_json::from_str(body)?;
        let cart = match value.get_mut("data").map(serde_json::Value::take) {
            Some(serde_json::Value::Null) => return Ok(Self::default()),
            Some(data) => data,
            None => value,
        };
        serde_json::from_value(cart)
    }

    /// Whether the cart holds no units.
    ///
    /// Zero-quantity lines are dropped on conversion, so a cart made only of
    /// them counts as empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.iter().all(|line| line.quantity == 0)
    }
}

/// One line of the server-side cart.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteCartLine {
    /// Scalar unit price, present on newer endpoints.
    #[serde(default)]
    pub price: Option<Decimal>,
    /// Number of units.
    pub quantity: u32,
    /// Product the line refers to.
    pub product: RemoteProduct,
    /// Selected specification.
    #[serde(default)]
    pub specification_id: Option<SpecificationId>,
    /// Creation time, when the API reports it.
    #[serde(default, alias = "created_at")]
    pub added_at: Option<DateTime<Utc>>,
}

/// Product summary nested in a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteProduct {
    /// Product identifier.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Thumbnail URL.
    #[serde(default, alias = "image")]
    pub thumbnail: Option<String>,
    /// Price, either a bare amount or a block with regular and discounted prices.
    #[serde(default)]
    pub price: Option<ProductPrice>,
    /// Discounted price reported next to a bare `price`.
    #[serde(default)]
    pub discounted_price: Option<Decimal>,
}

/// Product price as sent by different API versions.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ProductPrice {
    /// `"price": "129.00"` or `"price": 129`.
    Amount(Decimal),
    /// `"price": {"price": "129.00", "discounted_price": "99.00"}`.
    Block(PriceBlock),
}

/// Nested price block.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PriceBlock {
    /// Price before discount.
    #[serde(default, alias = "regular_price")]
    pub price: Option<Decimal>,
    /// Price after discount.
    #[serde(default, alias = "sale_price")]
    pub discounted_price: Option<Decimal>,
}
