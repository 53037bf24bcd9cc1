//! Normalization of remote cart lines into [`CartLineItem`]s.
//!
//! The unit price of a remote line is resolved through a fixed fallback
//! chain, because its location depends on which API version served the cart:
//!
//! 1. the scalar `price` on the line
//! 2. the product's discounted price
//! 3. the product's regular price
//! 4. zero
//!
//! A negative candidate is skipped rather than trusted.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use timberline_core::{CartLineItem, Price, ProductId, Quantity};

use super::types::{ProductPrice, RemoteCart, RemoteCartLine, RemoteProduct};
use crate::models::AppliedCoupon;

/// Where a line's unit price came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceSource {
    /// Scalar price on the cart line.
    Line,
    /// Product's discounted price.
    Discounted,
    /// Product's price before discount.
    Regular,
    /// No usable price; defaulted to zero.
    Missing,
}

/// Discounted price of a product, from either a price block or the sibling field.
fn discounted_price(product: &RemoteProduct) -> Option<Decimal> {
    match &product.price {
        Some(ProductPrice::Block(block)) => block.discounted_price.or(product.discounted_price),
        _ => product.discounted_price,
    }
}

/// Regular (pre-discount) price of a product.
fn regular_price(product: &RemoteProduct) -> Option<Decimal> {
    match &product.price {
        Some(ProductPrice::Amount(amount)) => Some(*amount),
        Some(ProductPrice::Block(block)) => block.price,
        None => None,
    }
}

/// Resolve the unit price of a remote line through the fallback chain.
#[must_use]
pub fn resolve_unit_price(line: &RemoteCartLine) -> (Price, PriceSource) {
    let candidates = [
        (line.price, PriceSource::Line),
        (discounted_price(&line.product), PriceSource::Discounted),
        (regular_price(&line.product), PriceSource::Regular),
    ];

    candidates
        .into_iter()
        .filter_map(|(amount, source)| amount.map(|a| (a, source)))
        .find_map(|(amount, source)| match Price::new(amount) {
            Ok(price) => Some((price, source)),
            Err(e) => {
                tracing::warn!(
                    product_id = %line.product.id,
                    ?source,
                    error = %e,
                    "Skipping invalid remote price"
                );
                None
            }
        })
        .unwrap_or((Price::ZERO, PriceSource::Missing))
}

/// Convert a remote line into a cart line.
///
/// Returns `None` for zero-quantity lines, which the cart never holds.
#[must_use]
pub fn convert_line(line: RemoteCartLine, now: DateTime<Utc>) -> Option<CartLineItem> {
    let Ok(quantity) = Quantity::new(line.quantity) else {
        tracing::debug!(product_id = %line.product.id, "Dropping zero-quantity remote line");
        return None;
    };

    let (unit_price, source) = resolve_unit_price(&line);
    if source == PriceSource::Missing {
        tracing::warn!(product_id = %line.product.id, "Remote line has no price, using zero");
    }

    Some(CartLineItem {
        id: line.product.id,
        name: line.product.name,
        unit_price,
        image: line.product.thumbnail,
        quantity,
        added_at: line.added_at.unwrap_or(now),
        variant: line.specification_id,
    })
}

/// Convert every line of a remote cart.
///
/// `stamp` supplies the timestamp for lines the API reports without one, so
/// a caller can keep the time a line was first seen locally.
#[must_use]
pub fn convert_cart<F>(lines: Vec<RemoteCartLine>, stamp: F) -> Vec<CartLineItem>
where
    F: Fn(&ProductId) -> DateTime<Utc>,
{
    lines
        .into_iter()
        .filter_map(|line| {
            let fallback = stamp(&line.product.id);
            convert_line(line, fallback)
        })
        .collect()
}

/// Coupon applied to a remote cart, if it reports one.
#[must_use]
pub fn applied_coupon(cart: &RemoteCart) -> Option<AppliedCoupon> {
    let code = cart.coupon.as_deref().map(str::trim).filter(|c| !c.is_empty())?;
    Some(AppliedCoupon {
        code: code.to_string(),
        discount: cart.discount.unwrap_or_default().max(Decimal::ZERO),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line_from(json: &str) -> RemoteCartLine {
        serde_json::from_str(json).unwrap()
    }

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_line_price_wins() {
        let line = line_from(
            r#"{
                "price": "80.00",
                "quantity": 1,
                "product": {
                    "id": 3, "name": "Side Table",
                    "price": {"price": "120.00", "discounted_price": "95.00"}
                }
            }"#,
        );
        let (price, source) = resolve_unit_price(&line);
        assert_eq!(price.amount(), dec("80.00"));
        assert_eq!(source, PriceSource::Line);
    }

    #[test]
    fn test_discounted_price_from_block() {
        let line = line_from(
            r#"{
                "quantity": 1,
                "product": {
                    "id": 3, "name": "Side Table",
                    "price": {"price": "120.00", "discounted_price": "95.00"}
                }
            }"#,
        );
        assert_eq!(
            resolve_unit_price(&line),
            (Price::new(dec("95.00")).unwrap(), PriceSource::Discounted)
        );
    }

    #[test]
    fn test_discounted_price_beside_bare_amount() {
        let line = line_from(
            r#"{
                "quantity": 1,
                "product": {"id": 3, "name": "Side Table", "price": 120, "discounted_price": 99}
            }"#,
        );
        assert_eq!(
            resolve_unit_price(&line),
            (Price::new(dec("99")).unwrap(), PriceSource::Discounted)
        );
    }

    #[test]
    fn test_regular_price_fallback() {
        let line = line_from(
            r#"{"quantity": 1, "product": {"id": 3, "name": "Side Table", "price": {"price": "120.00"}}}"#,
        );
        assert_eq!(
            resolve_unit_price(&line),
            (Price::new(dec("120.00")).unwrap(), PriceSource::Regular)
        );
    }

    #[test]
    fn test_missing_price_defaults_to_zero() {
        let line = line_from(r#"{"quantity": 1, "product": {"id": 3, "name": "Side Table"}}"#);
        assert_eq!(
            resolve_unit_price(&line),
            (Price::ZERO, PriceSource::Missing)
        );
    }

    #[test]
    fn test_negative_candidate_is_skipped() {
        let line = line_from(
            r#"{"price": "-5", "quantity": 1, "product": {"id": 3, "name": "Side Table", "price": "40"}}"#,
        );
        assert_eq!(
            resolve_unit_price(&line),
            (Price::new(dec("40")).unwrap(), PriceSource::Regular)
        );
    }

    #[test]
    fn test_convert_line_maps_fields() {
        let now = Utc::now();
        let line = line_from(
            r#"{
                "quantity": 2,
                "specification_id": 17,
                "product": {"id": "bench-1", "name": "Oak Bench", "thumbnail": "https://cdn.test/b.jpg", "price": "250"}
            }"#,
        );
        let item = convert_line(line, now).unwrap();
        assert_eq!(item.id.as_str(), "bench-1");
        assert_eq!(item.name, "Oak Bench");
        assert_eq!(item.quantity.get(), 2);
        assert_eq!(item.image.as_deref(), Some("https://cdn.test/b.jpg"));
        assert_eq!(item.variant.as_ref().map(|v| v.as_str()), Some("17"));
        assert_eq!(item.added_at, now);
    }

    #[test]
    fn test_convert_cart_drops_zero_quantity() {
        let cart = RemoteCart::from_json(
            r#"{"items": [
                {"quantity": 0, "product": {"id": 1, "name": "Gone"}},
                {"quantity": 1, "product": {"id": 2, "name": "Kept"}}
            ]}"#,
        )
        .unwrap();
        let items = convert_cart(cart.items, |_| Utc::now());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Kept");
    }

    #[test]
    fn test_convert_cart_uses_stamp_for_missing_timestamps() {
        let earlier = "2025-03-01T10:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let reported = "2025-04-01T10:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let cart = RemoteCart::from_json(
            r#"{"items": [
                {"quantity": 1, "product": {"id": 1, "name": "Known"}},
                {"quantity": 1, "created_at": "2025-04-01T10:00:00Z", "product": {"id": 2, "name": "Stamped"}}
            ]}"#,
        )
        .unwrap();
        let items = convert_cart(cart.items, |_| earlier);
        assert_eq!(items[0].added_at, earlier);
        assert_eq!(items[1].added_at, reported);
    }

    #[test]
    fn test_applied_coupon() {
        let cart = RemoteCart::from_json(
            r#"{"data": {"items": [], "coupon_code": "OAK10", "discount_amount": "25.00"}}"#,
        )
        .unwrap();
        assert_eq!(
            applied_coupon(&cart),
            Some(AppliedCoupon {
                code: "OAK10".to_string(),
                discount: dec("25.00"),
            })
        );

        let blank = RemoteCart::from_json(r#"{"coupon": "  ", "discount": 5}"#).unwrap();
        assert_eq!(applied_coupon(&blank), None);
    }
}
