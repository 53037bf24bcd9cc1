//! Zombie session detection.
//!
//! A zombie session is a server-issued session marker that outlived the
//! client-side token, for example after the token slot was wiped. The server
//! still treats the client as logged in while the cart treats it as a guest.
//! Recovery clears the server session so the next login starts clean.

use std::fmt;
use std::sync::Arc;

use tracing::instrument;

use super::AuthGate;
use crate::api::SessionEndpoint;
use crate::models::storage_keys;
use crate::storage::KeyValueStore;

/// Outcome of a session consistency check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// No token and no session marker.
    Guest,
    /// A token is stored.
    Authenticated,
    /// A session marker existed without a token and was dropped.
    Zombie {
        /// Whether the server acknowledged the session clear.
        remote_cleared: bool,
    },
}

/// Detects and recovers from zombie sessions.
pub struct SessionGuard {
    markers: Arc<dyn KeyValueStore>,
    auth: AuthGate,
    endpoint: Arc<dyn SessionEndpoint>,
}

impl fmt::Debug for SessionGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionGuard")
            .field("auth", &self.auth)
            .finish_non_exhaustive()
    }
}

impl SessionGuard {
    /// Create a guard.
    ///
    /// # Arguments
    ///
    /// * `markers` - Store holding the session marker slot
    /// * `auth` - Gate reading the token slot
    /// * `endpoint` - Server endpoint that clears the session
    #[must_use]
    pub fn new(
        markers: Arc<dyn KeyValueStore>,
        auth: AuthGate,
        endpoint: Arc<dyn SessionEndpoint>,
    ) -> Self {
        Self {
            markers,
            auth,
            endpoint,
        }
    }

    fn has_marker(&self) -> bool {
        match self.markers.get(storage_keys::SESSION_MARKER) {
            Ok(marker) => marker.is_some_and(|m| !m.trim().is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read session marker");
                false
            }
        }
    }

    /// Check for a zombie session and recover from it.
    ///
    /// Never fails: a server that refuses to clear the session is logged and
    /// reported through `remote_cleared`, and the local marker is dropped
    /// either way.
    #[instrument(skip(self))]
    pub async fn check(&self) -> SessionStatus {
        if self.auth.is_authenticated() {
            return SessionStatus::Authenticated;
        }
        if !self.has_marker() {
            return SessionStatus::Guest;
        }

        tracing::warn!("Session marker present without auth token, forcing logout");

        let remote_cleared = match self.endpoint.clear_session().await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "Failed to clear server session");
                false
            }
        };

        if let Err(e) = self.markers.remove(storage_keys::SESSION_MARKER) {
            tracing::warn!(error = %e, "Failed to drop session marker");
        }

        SessionStatus::Zombie { remote_cleared }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::api::{GatewayError, MockSessionEndpoint};
    use crate::storage::MemoryStore;

    fn guard_with(store: Arc<MemoryStore>, endpoint: MockSessionEndpoint) -> SessionGuard {
        SessionGuard::new(
            store.clone(),
            AuthGate::new(store),
            Arc::new(endpoint),
        )
    }

    #[tokio::test]
    async fn test_guest_without_marker() {
        let mut endpoint = MockSessionEndpoint::new();
        endpoint.expect_clear_session().never();

        let guard = guard_with(Arc::new(MemoryStore::new()), endpoint);
        assert_eq!(guard.check().await, SessionStatus::Guest);
    }

    #[tokio::test]
    async fn test_authenticated_with_marker_is_consistent() {
        let mut endpoint = MockSessionEndpoint::new();
        endpoint.expect_clear_session().never();

        let store = Arc::new(MemoryStore::with_slots([
            (storage_keys::AUTH_TOKEN, "tok"),
            (storage_keys::SESSION_MARKER, "sess"),
        ]));
        let guard = guard_with(store.clone(), endpoint);

        assert_eq!(guard.check().await, SessionStatus::Authenticated);
        assert!(store.get(storage_keys::SESSION_MARKER).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_zombie_session_is_cleared() {
        let mut endpoint = MockSessionEndpoint::new();
        endpoint.expect_clear_session().times(1).returning(|| Ok(()));

        let store = Arc::new(MemoryStore::with_slots([(storage_keys::SESSION_MARKER, "sess")]));
        let guard = guard_with(store.clone(), endpoint);

        assert_eq!(
            guard.check().await,
            SessionStatus::Zombie {
                remote_cleared: true
            }
        );
        assert_eq!(store.get(storage_keys::SESSION_MARKER).unwrap(), None);
    }

    #[tokio::test]
    async fn test_zombie_marker_dropped_even_if_server_fails() {
        let mut endpoint = MockSessionEndpoint::new();
        endpoint
            .expect_clear_session()
            .times(1)
            .returning(|| Err(GatewayError::RateLimited(5)));

        let store = Arc::new(MemoryStore::with_slots([(storage_keys::SESSION_MARKER, "sess")]));
        let guard = guard_with(store.clone(), endpoint);

        assert_eq!(
            guard.check().await,
            SessionStatus::Zombie {
                remote_cleared: false
            }
        );
        assert_eq!(store.get(storage_keys::SESSION_MARKER).unwrap(), None);
    }
}
