//! Cart services.
//!
//! - `auth` - token-based authentication status and zombie-session recovery
//! - `cart` - the cart state container and guest-to-account reconciliation

pub mod auth;
pub mod cart;

pub use auth::{AuthEvent, AuthGate, SessionGuard, SessionStatus};
pub use cart::{CartStore, ReconcileOutcome};
