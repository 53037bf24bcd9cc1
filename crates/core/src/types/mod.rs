//! Core types for Timberline.
//!
//! This module provides type-safe wrappers for common cart concepts.

pub mod id;
pub mod line_item;
pub mod price;
pub mod quantity;

pub use id::*;
pub use line_item::{CartLineItem, CartProduct};
pub use price::{Price, PriceError};
pub use quantity::{Quantity, QuantityError};
