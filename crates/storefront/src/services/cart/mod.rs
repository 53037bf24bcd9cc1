//! Cart state container.
//!
//! [`CartStore`] owns the in-memory cart and routes every mutation by
//! authentication mode:
//!
//! - **Guest**: mutations apply locally and cannot fail.
//! - **Authenticated**: mutations go to the remote cart, followed by a full
//!   re-fetch that replaces the local list. A failed call leaves the last
//!   known-good list untouched.
//!
//! In both modes the resulting lines are mirrored to the durable store.
//!
//! # Example
//!
//! ```rust,ignore
//! let store = CartStore::new(gateway, storage, auth, Arc::new(TracingNotifier));
//! store.initialize().await?;
//! store.add_item(product, Quantity::ONE, None).await?;
//! println!("{} items, {}", store.total_item_count(), store.total_price());
//! ```

mod persist;
mod reconcile;

#[cfg(test)]
mod fake;

pub use reconcile::ReconcileOutcome;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::instrument;

use timberline_core::{CartProduct, ProductId, Quantity, SpecificationId};

use crate::api::conversions::{applied_coupon, convert_cart};
use crate::api::{CartGateway, CartItemUpdate, GatewayError, RemoteCart};
use crate::error::{CartError, Result, add_breadcrumb, report_failure};
use crate::models::{AppliedCoupon, CartState};
use crate::notify::{Notice, Notifier};
use crate::services::auth::{AuthEvent, AuthGate};
use crate::storage::KeyValueStore;

/// Shown when an authenticated mutation fails.
const UPDATE_FAILED: &str = "Could not update your cart. Please try again.";

// =============================================================================
// CartStore
// =============================================================================

/// Handle to the shopping cart.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartStoreInner>,
}

struct CartStoreInner {
    gateway: Arc<dyn CartGateway>,
    storage: Arc<dyn KeyValueStore>,
    auth: AuthGate,
    notifier: Arc<dyn Notifier>,
    state: Mutex<CartState>,
    /// Serializes reconciliations.
    sync_lock: tokio::sync::Mutex<()>,
    initialized: AtomicBool,
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("state", &*self.state())
            .finish_non_exhaustive()
    }
}

impl CartStore {
    /// Create a cart with an empty state.
    ///
    /// Call [`initialize`](Self::initialize) before use to hydrate it.
    #[must_use]
    pub fn new(
        gateway: Arc<dyn CartGateway>,
        storage: Arc<dyn KeyValueStore>,
        auth: AuthGate,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            inner: Arc::new(CartStoreInner {
                gateway,
                storage,
                auth,
                notifier,
                state: Mutex::new(CartState::default()),
                sync_lock: tokio::sync::Mutex::new(()),
                initialized: AtomicBool::new(false),
            }),
        }
    }

    // =========================================================================
    // State access
    // =========================================================================

    fn state(&self) -> MutexGuard<'_, CartState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn read<R>(&self, f: impl FnOnce(&CartState) -> R) -> R {
        f(&self.state())
    }

    /// Apply a mutation and mirror the lines to the durable store.
    fn update<R>(&self, f: impl FnOnce(&mut CartState) -> R) -> R {
        let mut state = self.state();
        let result = f(&mut state);
        persist::save(self.inner.storage.as_ref(), &state.items);
        result
    }

    fn set_loading(&self, loading: bool) {
        self.state().is_loading = loading;
    }

    /// Re-read the auth gate and record the result in the state.
    fn refresh_auth(&self) -> bool {
        let authenticated = self.inner.auth.is_authenticated();
        self.state().is_authenticated = authenticated;
        authenticated
    }

    fn notify(&self, notice: Notice) {
        self.inner.notifier.notify(notice);
    }

    /// Replace the local lines with a remote snapshot.
    ///
    /// Lines the API reports without a timestamp keep the local one.
    fn adopt(&self, cart: RemoteCart) -> usize {
        let now = Utc::now();
        let reported = applied_coupon(&cart);
        let discount = cart.discount;
        self.update(|state| {
            let items = convert_cart(cart.items, |id| {
                state.line(id).map_or(now, |line| line.added_at)
            });
            state.replace_items(items);
            // A discount reported without a code still belongs to the held coupon.
            let held = state.coupon.take();
            state.coupon = reported.or_else(|| {
                held.zip(discount).map(|(coupon, discount)| AppliedCoupon {
                    code: coupon.code,
                    discount: discount.max(Decimal::ZERO),
                })
            });
            state.items.len()
        })
    }

    /// Log, report and announce a failed action.
    fn fail(&self, action: &str, err: CartError, message: &str) -> CartError {
        report_failure(action, &err);
        self.notify(Notice::error(message));
        err
    }

    /// Push one line to the remote cart and re-fetch the whole cart.
    async fn push_update(&self, action: &str, update: &CartItemUpdate) -> Result<()> {
        self.set_loading(true);
        let result = self.upsert_and_fetch(update).await;
        self.set_loading(false);

        match result {
            Ok(cart) => {
                self.adopt(cart);
                Ok(())
            }
            Err(e) => Err(self.fail(action, e.into(), UPDATE_FAILED)),
        }
    }

    async fn upsert_and_fetch(
        &self,
        update: &CartItemUpdate,
    ) -> std::result::Result<RemoteCart, GatewayError> {
        self.inner.gateway.upsert_item(update).await?;
        self.inner.gateway.fetch_cart().await
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> CartState {
        self.read(Clone::clone)
    }

    /// Sum of quantities across all lines.
    #[must_use]
    pub fn total_item_count(&self) -> u64 {
        self.read(CartState::total_item_count)
    }

    /// Sum of unit price times quantity across all lines.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        self.read(CartState::total_price)
    }

    /// Total after the applied coupon, never below zero.
    #[must_use]
    pub fn discounted_total(&self) -> Decimal {
        self.read(CartState::discounted_total)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Hydrate from the durable store and reconcile with the remote cart when
    /// logged in.
    ///
    /// Only the first call does anything; later calls return
    /// [`ReconcileOutcome::Skipped`].
    ///
    /// # Errors
    ///
    /// Returns an error if the remote cart cannot be read. The hydrated
    /// local cart is kept in that case.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<ReconcileOutcome> {
        if self.inner.initialized.swap(true, Ordering::SeqCst) {
            return Ok(ReconcileOutcome::Skipped);
        }

        let items = persist::load(self.inner.storage.as_ref());
        tracing::debug!(lines = items.len(), "Hydrated cart from durable store");
        self.update(|state| state.replace_items(items));

        self.reconcile().await
    }

    /// React to an authentication change.
    ///
    /// Sign-in events reconcile the guest cart with the account cart. Logout
    /// clears the local mirror and returns `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if reconciliation fails.
    #[instrument(skip(self))]
    pub async fn on_auth_event(&self, event: AuthEvent) -> Result<Option<ReconcileOutcome>> {
        if event.is_sign_in() {
            return self.reconcile().await.map(Some);
        }

        self.update(|state| {
            state.clear();
            state.is_authenticated = false;
        });
        tracing::info!("Cleared cart after logout");
        Ok(None)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add units of a product.
    ///
    /// Re-adding a product already in the cart adds to its quantity.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote cart rejects the change. Guest carts
    /// never fail.
    #[instrument(
        skip(self, product, quantity),
        fields(product_id = %product.id, quantity = quantity.get())
    )]
    pub async fn add_item(
        &self,
        product: CartProduct,
        quantity: Quantity,
        variant: Option<SpecificationId>,
    ) -> Result<()> {
        add_breadcrumb("cart", "Added item", Some(&[("product_id", product.id.as_str())]));
        let name = product.name.clone();

        if self.refresh_auth() {
            let existing = self.read(|state| state.quantity_of(&product.id));
            let update = CartItemUpdate::new(
                product.id,
                existing.saturating_add(quantity.get()),
                variant,
            );
            self.push_update("add_item", &update).await?;
        } else {
            self.update(|state| state.add_line(product, quantity, variant, Utc::now()));
        }

        self.notify(Notice::success(format!("{name} added to cart")));
        Ok(())
    }

    /// Remove a product's line.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote cart rejects the change.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn remove_item(&self, id: &ProductId) -> Result<()> {
        add_breadcrumb("cart", "Removed item", Some(&[("product_id", id.as_str())]));

        if self.refresh_auth() {
            self.push_update("remove_item", &CartItemUpdate::remove(id.clone()))
                .await?;
        } else if !self.update(|state| state.remove_line(id)) {
            return Ok(());
        }

        self.notify(Notice::info("Item removed from cart"));
        Ok(())
    }

    /// Add `amount` units to an existing line. Unknown products are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote cart rejects the change.
    pub async fn increase_quantity(&self, id: &ProductId, amount: u32) -> Result<()> {
        let current = self.read(|state| state.quantity_of(id));
        if current == 0 {
            tracing::debug!(product_id = %id, "Ignoring increase for product not in cart");
            return Ok(());
        }
        let next = current.saturating_add(amount);
        if next == current {
            return Ok(());
        }
        self.apply_quantity(id, next).await
    }

    /// Take `amount` units off an existing line, removing it at zero.
    /// Unknown products are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote cart rejects the change.
    pub async fn decrease_quantity(&self, id: &ProductId, amount: u32) -> Result<()> {
        let current = self.read(|state| state.quantity_of(id));
        if current == 0 {
            tracing::debug!(product_id = %id, "Ignoring decrease for product not in cart");
            return Ok(());
        }
        let next = current.saturating_sub(amount);
        if next == current {
            return Ok(());
        }
        self.apply_quantity(id, next).await
    }

    /// Set the absolute quantity of a line; zero or less removes it.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote cart rejects the change.
    pub async fn set_quantity(&self, id: &ProductId, quantity: i64) -> Result<()> {
        let quantity = match Quantity::from_signed(quantity) {
            Ok(Some(quantity)) => quantity.get(),
            Ok(None) => 0,
            Err(e) => {
                tracing::warn!(product_id = %id, error = %e, "Clamping requested quantity");
                u32::MAX
            }
        };

        if quantity > 0 && self.read(|state| state.line(id).is_none()) {
            tracing::debug!(product_id = %id, "Ignoring quantity change for product not in cart");
            return Ok(());
        }
        self.apply_quantity(id, quantity).await
    }

    async fn apply_quantity(&self, id: &ProductId, quantity: u32) -> Result<()> {
        if quantity == 0 {
            return self.remove_item(id).await;
        }

        if self.refresh_auth() {
            let variant = self.read(|state| state.line(id).and_then(|line| line.variant.clone()));
            let update = CartItemUpdate::new(id.clone(), quantity, variant);
            self.push_update("set_quantity", &update).await
        } else {
            self.update(|state| state.set_line_quantity(id, quantity));
            Ok(())
        }
    }

    /// Empty the local cart. Never touches the remote cart.
    pub fn clear(&self) {
        self.refresh_auth();
        self.update(CartState::clear);
        self.notify(Notice::info("Cart cleared"));
    }

    /// Apply a coupon to the remote cart.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NotAuthenticated`] for guests, or an error if the
    /// remote cart rejects the coupon.
    #[instrument(skip(self))]
    pub async fn apply_coupon(&self, code: &str) -> Result<()> {
        let code = code.trim();
        if !self.refresh_auth() {
            self.notify(Notice::error("Log in to use a coupon"));
            return Err(CartError::NotAuthenticated);
        }

        self.set_loading(true);
        let result = self.inner.gateway.apply_coupon(code).await;
        self.set_loading(false);

        let cart = result
            .map_err(|e| self.fail("apply_coupon", e.into(), "Coupon could not be applied"))?;
        let echoed = applied_coupon(&cart).is_some();
        let reported_discount = cart.discount;
        self.adopt(cart);

        // Some API versions return the discount without echoing the code.
        if !echoed && let Some(discount) = reported_discount {
            self.update(|state| {
                state.coupon = Some(AppliedCoupon {
                    code: code.to_string(),
                    discount: discount.max(Decimal::ZERO),
                });
            });
        }

        self.notify(Notice::success(format!("Coupon {code} applied")));
        Ok(())
    }
}
