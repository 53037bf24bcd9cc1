//! In-memory cart state.
//!
//! `CartState` holds the line items plus the flags the UI renders from. All
//! methods here are synchronous and infallible; the mode-dependent logic
//! (guest vs. authenticated) lives in [`crate::services::cart::CartStore`].

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use timberline_core::{CartLineItem, CartProduct, ProductId, Quantity, SpecificationId};

/// A coupon accepted by the remote cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedCoupon {
    /// Coupon code as entered.
    pub code: String,
    /// Amount taken off the cart total.
    pub discount: Decimal,
}

/// Current contents of the cart.
///
/// Invariants:
/// - at most one line per product id
/// - every line has a quantity of at least one
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartState {
    /// Line items in insertion order.
    pub items: Vec<CartLineItem>,
    /// A remote call is in flight.
    pub is_loading: bool,
    /// Result of the last authentication check.
    pub is_authenticated: bool,
    /// Coupon applied to the remote cart, if any.
    pub coupon: Option<AppliedCoupon>,
}

impl CartState {
    /// Create a state holding `items`, merging duplicate product ids.
    #[must_use]
    pub fn with_items(items: Vec<CartLineItem>) -> Self {
        let mut state = Self::default();
        state.replace_items(items);
        state
    }

    /// Find the line for a product.
    #[must_use]
    pub fn line(&self, id: &ProductId) -> Option<&CartLineItem> {
        self.items.iter().find(|line| &line.id == id)
    }

    /// Units of a product in the cart, zero if absent.
    #[must_use]
    pub fn quantity_of(&self, id: &ProductId) -> u32 {
        self.line(id).map_or(0, |line| line.quantity.get())
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add units of a product, merging into an existing line.
    ///
    /// A new line is stamped with `now`; an existing line keeps its original
    /// timestamp and variant.
    pub fn add_line(
        &mut self,
        product: CartProduct,
        quantity: Quantity,
        variant: Option<SpecificationId>,
        now: DateTime<Utc>,
    ) {
        if let Some(line) = self.items.iter_mut().find(|line| line.id == product.id) {
            line.quantity = line.quantity.saturating_add(quantity.get());
            return;
        }
        self.items.push(CartLineItem::new(product, quantity, variant, now));
    }

    /// Set the absolute quantity of an existing line; zero removes it.
    ///
    /// Returns `false` if the product is not in the cart.
    pub fn set_line_quantity(&mut self, id: &ProductId, quantity: u32) -> bool {
        let Ok(quantity) = Quantity::new(quantity) else {
            return self.remove_line(id);
        };
        match self.items.iter_mut().find(|line| &line.id == id) {
            Some(line) => {
                line.quantity = quantity;
                true
            }
            None => false,
        }
    }

    /// Remove a product's line. Returns `false` if it was not in the cart.
    pub fn remove_line(&mut self, id: &ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|line| &line.id != id);
        self.items.len() != before
    }

    /// Replace all lines, merging duplicate product ids into the first
    /// occurrence.
    pub fn replace_items(&mut self, items: Vec<CartLineItem>) {
        let mut merged: Vec<CartLineItem> = Vec::with_capacity(items.len());
        for item in items {
            match merged.iter_mut().find(|line| line.id == item.id) {
                Some(line) => line.quantity = line.quantity.saturating_add(item.quantity.get()),
                None => merged.push(item),
            }
        }
        self.items = merged;
    }

    /// Drop every line and the applied coupon.
    pub fn clear(&mut self) {
        self.items.clear();
        self.coupon = None;
    }

    /// Sum of quantities across all lines.
    #[must_use]
    pub fn total_item_count(&self) -> u64 {
        self.items
            .iter()
            .map(|line| u64::from(line.quantity.get()))
            .sum()
    }

    /// Sum of unit price times quantity across all lines.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        self.items.iter().map(CartLineItem::line_total).sum()
    }

    /// Total after the coupon discount, never below zero.
    #[must_use]
    pub fn discounted_total(&self) -> Decimal {
        let discount = self
            .coupon
            .as_ref()
            .map_or(Decimal::ZERO, |coupon| coupon.discount);
        (self.total_price() - discount).max(Decimal::ZERO)
    }
}
