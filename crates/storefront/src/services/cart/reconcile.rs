//! Guest-to-account cart reconciliation.
//!
//! Runs at startup and after every sign-in. A non-empty remote cart always
//! wins and replaces whatever the guest collected. An empty remote cart is
//! seeded from the guest lines, pushed one at a time so the server merges
//! them in order.

use tracing::instrument;

use super::CartStore;
use crate::api::{CartItemUpdate, GatewayError};
use crate::error::Result;
use crate::models::CartState;
use crate::notify::Notice;

/// What a reconciliation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Not logged in, or already initialized; nothing was done.
    Skipped,
    /// Both carts were empty.
    Empty,
    /// The remote cart replaced the local one.
    AdoptedRemote { lines: usize },
    /// Guest lines were pushed and the re-fetched cart adopted.
    PushedLocal { pushed: usize, failed: usize },
    /// Every push failed to stick; the local cart was cleared.
    PushFailed { failed: usize },
}

impl CartStore {
    /// Reconcile the local cart with the remote one.
    ///
    /// Concurrent calls run one after another.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote cart cannot be read. The local cart is
    /// left as it was.
    #[instrument(skip(self))]
    pub async fn reconcile(&self) -> Result<ReconcileOutcome> {
        let _sync = self.inner.sync_lock.lock().await;

        if !self.refresh_auth() {
            tracing::debug!("Not authenticated, skipping reconciliation");
            return Ok(ReconcileOutcome::Skipped);
        }

        self.set_loading(true);
        let result = self.reconcile_locked().await;
        self.set_loading(false);

        let outcome =
            result.map_err(|e| self.fail("reconcile", e.into(), "Could not sync your cart"))?;
        tracing::info!(?outcome, "Cart reconciled");
        Ok(outcome)
    }

    async fn reconcile_locked(&self) -> std::result::Result<ReconcileOutcome, GatewayError> {
        let remote = self.inner.gateway.fetch_cart().await?;
        if !remote.is_empty() {
            let lines = self.adopt(remote);
            return Ok(ReconcileOutcome::AdoptedRemote { lines });
        }

        let pending: Vec<CartItemUpdate> = self.read(|state| {
            state
                .items
                .iter()
                .map(|line| {
                    CartItemUpdate::new(line.id.clone(), line.quantity.get(), line.variant.clone())
                })
                .collect()
        });

        if pending.is_empty() {
            self.update(CartState::clear);
            return Ok(ReconcileOutcome::Empty);
        }

        let mut failed = 0;
        for update in &pending {
            if let Err(e) = self.inner.gateway.upsert_item(update).await {
                failed += 1;
                tracing::warn!(
                    product_id = %update.product_id,
                    error = %e,
                    "Failed to push guest cart line"
                );
            }
        }

        let refreshed = self.inner.gateway.fetch_cart().await?;
        if refreshed.is_empty() {
            tracing::warn!(failed, "Remote cart still empty after push, clearing local cart");
            self.update(CartState::clear);
            return Ok(ReconcileOutcome::PushFailed { failed });
        }

        self.adopt(refreshed);
        self.notify(Notice::success("Your cart has been synced"));
        Ok(ReconcileOutcome::PushedLocal {
            pushed: pending.len() - failed,
            failed,
        })
    }
}
