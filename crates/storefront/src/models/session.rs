//! Storage slot keys.
//!
//! The durable store behaves like browser local storage: one flat namespace
//! shared by the cart, the auth token and the session marker.

/// Keys for durable storage slots.
pub mod keys {
    /// Key for the serialized guest cart.
    pub const CART: &str = "cart-storage";

    /// Key for the opaque bearer token issued by the auth service.
    pub const AUTH_TOKEN: &str = "auth-token";

    /// Key for the server-issued session marker (the session cookie).
    pub const SESSION_MARKER: &str = "session-marker";
}
