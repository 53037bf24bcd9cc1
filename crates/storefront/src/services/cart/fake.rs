//! In-memory remote cart for store tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use rust_decimal::Decimal;

use timberline_core::ProductId;

use crate::api::{
    CartGateway, CartItemUpdate, GatewayError, RemoteCart, RemoteCartLine, RemoteProduct,
};

const DEFAULT_PRICE: Decimal = Decimal::TEN;

#[derive(Default)]
pub(super) struct FakeGateway {
    lines: Mutex<Vec<RemoteCartLine>>,
    prices: Mutex<HashMap<ProductId, Decimal>>,
    coupon: Mutex<Option<(String, Decimal)>>,
    applied: Mutex<Option<(String, Decimal)>>,
    upserts: Mutex<Vec<CartItemUpdate>>,
    fetches: AtomicUsize,
    failing: AtomicBool,
    upserts_failing: AtomicBool,
}

impl FakeGateway {
    /// Remote cart pre-filled with `(id, price, quantity)` lines.
    pub(super) fn with_lines(lines: &[(&str, &str, u32)]) -> Self {
        let gateway = Self::default();
        for (id, price, quantity) in lines {
            let id = ProductId::parse(id).unwrap_or_else(|e| panic!("bad id: {e}"));
            let price: Decimal = price.parse().unwrap_or_else(|e| panic!("bad price: {e}"));
            gateway.lock_prices().insert(id.clone(), price);
            gateway.lock_lines().push(remote_line(id, price, *quantity));
        }
        gateway
    }

    /// Accept `code` for a flat `discount`.
    pub(super) fn set_coupon(&self, code: &str, discount: Decimal) {
        *self.coupon.lock().unwrap_or_else(PoisonError::into_inner) =
            Some((code.to_string(), discount));
    }

    /// Fail every call.
    pub(super) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Fail upserts only; reads keep working.
    pub(super) fn set_upserts_failing(&self, failing: bool) {
        self.upserts_failing.store(failing, Ordering::SeqCst);
    }

    pub(super) fn upserts(&self) -> Vec<CartItemUpdate> {
        self.upserts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(super) fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub(super) fn remote_quantities(&self) -> Vec<(String, u32)> {
        self.lock_lines()
            .iter()
            .map(|line| (line.product.id.to_string(), line.quantity))
            .collect()
    }

    fn lock_lines(&self) -> std::sync::MutexGuard<'_, Vec<RemoteCartLine>> {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_prices(&self) -> std::sync::MutexGuard<'_, HashMap<ProductId, Decimal>> {
        self.prices.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check(&self) -> Result<(), GatewayError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(GatewayError::Api {
                status: 503,
                message: "service unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn snapshot(&self) -> RemoteCart {
        let applied = self
            .applied
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        RemoteCart {
            items: self.lock_lines().clone(),
            coupon: applied.as_ref().map(|(code, _)| code.clone()),
            discount: applied.map(|(_, discount)| discount),
        }
    }
}

fn remote_line(id: ProductId, price: Decimal, quantity: u32) -> RemoteCartLine {
    RemoteCartLine {
        price: Some(price),
        quantity,
        product: RemoteProduct {
            name: format!("Item {id}"),
            id,
            thumbnail: None,
            price: None,
            discounted_price: None,
        },
        specification_id: None,
        added_at: None,
    }
}

#[async_trait]
impl CartGateway for FakeGateway {
    async fn fetch_cart(&self) -> Result<RemoteCart, GatewayError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.snapshot())
    }

    async fn upsert_item(&self, update: &CartItemUpdate) -> Result<RemoteCart, GatewayError> {
        self.check()?;
        if self.upserts_failing.load(Ordering::SeqCst) {
            return Err(GatewayError::Api {
                status: 422,
                message: "product unavailable".to_string(),
            });
        }
        self.upserts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(update.clone());

        let price = self
            .lock_prices()
            .get(&update.product_id)
            .copied()
            .unwrap_or(DEFAULT_PRICE);
        {
            let mut lines = self.lock_lines();
            let existing = lines
                .iter()
                .position(|line| line.product.id == update.product_id);
            match (existing, update.quantity) {
                (Some(index), 0) => {
                    lines.remove(index);
                }
                (Some(index), quantity) => lines[index].quantity = quantity,
                (None, 0) => {}
                (None, quantity) => {
                    let mut line = remote_line(update.product_id.clone(), price, quantity);
                    line.specification_id.clone_from(&update.specification_id);
                    lines.push(line);
                }
            }
        }
        Ok(self.snapshot())
    }

    async fn apply_coupon(&self, code: &str) -> Result<RemoteCart, GatewayError> {
        self.check()?;
        let accepted = self
            .coupon
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .filter(|(valid, _)| valid == code);
        let Some(coupon) = accepted else {
            return Err(GatewayError::Api {
                status: 422,
                message: "invalid coupon".to_string(),
            });
        };
        *self.applied.lock().unwrap_or_else(PoisonError::into_inner) = Some(coupon);
        Ok(self.snapshot())
    }
}
