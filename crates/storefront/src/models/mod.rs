//! Domain models for the cart client.

pub mod cart;
pub mod session;

pub use cart::{AppliedCoupon, CartState};
pub use session::keys as storage_keys;
