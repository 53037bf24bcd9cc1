//! Cart line items.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Price, ProductId, Quantity, SpecificationId};

/// Catalog data needed to put a product in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartProduct {
    /// Product identifier.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Unit price at the time the product was added.
    pub unit_price: Price,
    /// Thumbnail URL.
    pub image: Option<String>,
}

/// One row of the cart.
///
/// A cart holds at most one line per [`ProductId`]; adding the same product
/// again merges into the existing line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLineItem {
    /// Product identifier, unique within the cart.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Unit price.
    pub unit_price: Price,
    /// Thumbnail URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Number of units, always at least one.
    pub quantity: Quantity,
    /// When the line was first added.
    pub added_at: DateTime<Utc>,
    /// Selected product specification (finish, fabric, size).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<SpecificationId>,
}

impl CartLineItem {
    /// Create a new line from a product.
    #[must_use]
    pub fn new(
        product: CartProduct,
        quantity: Quantity,
        variant: Option<SpecificationId>,
        added_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: product.id,
            name: product.name,
            unit_price: product.unit_price,
            image: product.image,
            quantity,
            added_at,
            variant,
        }
    }

    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price.line_total(self.quantity)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn armchair() -> CartProduct {
        CartProduct {
            id: ProductId::parse("armchair-7").unwrap(),
            name: "Walnut Armchair".to_string(),
            unit_price: Price::parse("320.00").unwrap(),
            image: Some("https://cdn.example.com/armchair.jpg".to_string()),
        }
    }

    #[test]
    fn test_line_total() {
        let line = CartLineItem::new(armchair(), Quantity::new(2).unwrap(), None, Utc::now());
        assert_eq!(line.line_total(), Decimal::new(64000, 2));
    }

    #[test]
    fn test_optional_fields_omitted_when_absent() {
        let mut product = armchair();
        product.image = None;
        let line = CartLineItem::new(product, Quantity::ONE, None, Utc::now());
        let json = serde_json::to_value(&line).unwrap();
        assert!(json.get("image").is_none());
        assert!(json.get("variant").is_none());
        assert_eq!(json["unit_price"], "320.00");
    }

    #[test]
    fn test_deserialize_rejects_zero_quantity() {
        let json = r#"{
            "id": "armchair-7",
            "name": "Walnut Armchair",
            "unit_price": "320.00",
            "quantity": 0,
            "added_at": "2026-01-04T10:00:00Z"
        }"#;
        assert!(serde_json::from_str::<CartLineItem>(json).is_err());
    }
}
