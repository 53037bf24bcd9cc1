//! Authentication status for the cart.
//!
//! Tokens are issued elsewhere (login, registration, OTP verification) and
//! written to the durable store by the auth flow. The cart only ever reads
//! them: a present, non-blank token means the remote cart is authoritative.

mod session;

pub use session::{SessionGuard, SessionStatus};

use std::fmt;
use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};

use crate::models::storage_keys;
use crate::storage::KeyValueStore;

/// Authentication transitions the cart reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    /// Password login succeeded.
    LoggedIn,
    /// Account registration succeeded and the user is signed in.
    Registered,
    /// One-time-password verification succeeded.
    OtpVerified,
    /// The user signed out and the token was removed.
    LoggedOut,
}

impl AuthEvent {
    /// Whether this event means a guest just became authenticated.
    #[must_use]
    pub const fn is_sign_in(self) -> bool {
        matches!(self, Self::LoggedIn | Self::Registered | Self::OtpVerified)
    }
}

/// Reads the persisted bearer token to decide guest vs. authenticated mode.
///
/// The token is re-read on every call; login state can change between
/// two cart actions.
#[derive(Clone)]
pub struct AuthGate {
    tokens: Arc<dyn KeyValueStore>,
}

impl fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthGate").finish_non_exhaustive()
    }
}

impl AuthGate {
    /// Create a gate reading the token slot of `tokens`.
    #[must_use]
    pub fn new(tokens: Arc<dyn KeyValueStore>) -> Self {
        Self { tokens }
    }

    /// Current bearer token, if one is stored.
    ///
    /// Blank tokens and unreadable storage both count as "no token".
    #[must_use]
    pub fn token(&self) -> Option<SecretString> {
        match self.tokens.get(storage_keys::AUTH_TOKEN) {
            Ok(Some(raw)) => {
                let token = SecretString::from(raw.trim().to_string());
                (!token.expose_secret().is_empty()).then_some(token)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read auth token, treating user as guest");
                None
            }
        }
    }

    /// Whether a token is currently stored.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_no_token_is_guest() {
        let gate = AuthGate::new(Arc::new(MemoryStore::new()));
        assert!(!gate.is_authenticated());
    }

    #[test]
    fn test_token_present_is_authenticated() {
        let store = Arc::new(MemoryStore::with_slots([(storage_keys::AUTH_TOKEN, "tok_abc")]));
        let gate = AuthGate::new(store);
        assert!(gate.is_authenticated());
        assert_eq!(gate.token().unwrap().expose_secret(), "tok_abc");
    }

    #[test]
    fn test_blank_token_is_guest() {
        let store = Arc::new(MemoryStore::with_slots([(storage_keys::AUTH_TOKEN, "  \n")]));
        assert!(!AuthGate::new(store).is_authenticated());
    }

    #[test]
    fn test_gate_is_not_cached() {
        let store = Arc::new(MemoryStore::new());
        let gate = AuthGate::new(store.clone());
        assert!(!gate.is_authenticated());

        store.set(storage_keys::AUTH_TOKEN, "tok_late").unwrap();
        assert!(gate.is_authenticated());

        store.remove(storage_keys::AUTH_TOKEN).unwrap();
        assert!(!gate.is_authenticated());
    }

    #[test]
    fn test_sign_in_events() {
        assert!(AuthEvent::LoggedIn.is_sign_in());
        assert!(AuthEvent::Registered.is_sign_in());
        assert!(AuthEvent::OtpVerified.is_sign_in());
        assert!(!AuthEvent::LoggedOut.is_sign_in());
    }

    #[test]
    fn test_debug_does_not_leak_token() {
        let store = Arc::new(MemoryStore::with_slots([(storage_keys::AUTH_TOKEN, "tok_secret")]));
        let gate = AuthGate::new(store);
        assert!(!format!("{gate:?}").contains("tok_secret"));
    }
}
