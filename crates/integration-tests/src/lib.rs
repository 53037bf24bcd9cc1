//! Integration test support for the Timberline cart.
//!
//! [`FakeCartApi`] is an in-process `axum` server speaking the storefront
//! cart API over real HTTP, so tests can drive
//! [`timberline_storefront::api::HttpCartGateway`] end to end.
//!
//! # Behavior
//!
//! - Every `/cart` route requires `Authorization: Bearer <token>` and answers
//!   401 otherwise
//! - Carts are returned in a `{"data": ...}` envelope; an empty cart is
//!   `{"data": null}`
//! - Products use the nested price block shape
//! - Failures can be injected for the next N requests
//!
//! # Example
//!
//! ```rust,ignore
//! let api = FakeCartApi::start("tok").await;
//! api.add_product("42", "Oak Bench", "249.00");
//! let config = ApiConfig::from_base_url(&api.base_url())?;
//! ```

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};

// =============================================================================
// Server state
// =============================================================================

#[derive(Debug, Clone)]
struct CatalogEntry {
    name: String,
    price: Decimal,
    discounted_price: Option<Decimal>,
}

#[derive(Debug, Clone)]
struct Line {
    product_id: String,
    quantity: u32,
    specification_id: Option<String>,
}

#[derive(Debug, Clone, Copy)]
struct Failure {
    status: StatusCode,
    remaining: usize,
}

#[derive(Debug, Default)]
struct Inner {
    catalog: HashMap<String, CatalogEntry>,
    lines: Vec<Line>,
    coupons: HashMap<String, Decimal>,
    applied: Option<(String, Decimal)>,
    failure: Option<Failure>,
    upserts: Vec<(String, u32)>,
}

#[derive(Debug)]
struct ApiState {
    token: String,
    inner: Mutex<Inner>,
    logouts: AtomicUsize,
}

impl ApiState {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| token == self.token)
    }

    /// Consume one injected failure, if any is pending.
    fn take_failure(&self) -> Option<StatusCode> {
        let mut inner = self.lock();
        let failure = inner.failure.as_mut()?;
        let status = failure.status;
        failure.remaining = failure.remaining.saturating_sub(1);
        if failure.remaining == 0 {
            inner.failure = None;
        }
        Some(status)
    }

    /// Check auth and injected failures for a cart request.
    fn guard(&self, headers: &HeaderMap) -> Option<Response> {
        if !self.authorized(headers) {
            return Some((StatusCode::UNAUTHORIZED, "Unauthenticated.").into_response());
        }
        self.take_failure().map(failure_response)
    }

    fn cart_json(&self) -> Value {
        let inner = self.lock();
        if inner.lines.is_empty() {
            return json!({ "data": null });
        }

        let items: Vec<Value> = inner
            .lines
            .iter()
            .map(|line| {
                let entry = inner.catalog.get(&line.product_id);
                json!({
                    "quantity": line.quantity,
                    "specification_id": line.specification_id,
                    "product": {
                        "id": line.product_id,
                        "name": entry.map_or("Unknown product", |e| e.name.as_str()),
                        "thumbnail": format!("https://cdn.timberline.test/{}.jpg", line.product_id),
                        "price": {
                            "price": entry.map(|e| e.price.to_string()),
                            "discounted_price": entry.and_then(|e| e.discounted_price).map(|d| d.to_string()),
                        },
                    },
                })
            })
            .collect();

        json!({
            "data": {
                "cart_items": items,
                "coupon_code": inner.applied.as_ref().map(|(code, _)| code.clone()),
                "discount_amount": inner.applied.as_ref().map(|(_, discount)| discount.to_string()),
            }
        })
    }
}

fn failure_response(status: StatusCode) -> Response {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return (
            status,
            [(header::RETRY_AFTER, "7")],
            "Too Many Attempts.",
        )
            .into_response();
    }
    (status, "Injected failure").into_response()
}

// =============================================================================
// Handlers
// =============================================================================

#[derive(Debug, Deserialize)]
struct UpsertBody {
    product_id: Value,
    quantity: u32,
    #[serde(default)]
    specification_id: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct CouponBody {
    coupon: String,
}

/// Render a JSON id (number or string) as a string.
fn id_string(value: &Value) -> String {
    value
        .as_str()
        .map_or_else(|| value.to_string(), ToString::to_string)
}

async fn get_cart(State(state): State<Arc<ApiState>>, headers: HeaderMap) -> Response {
    if let Some(response) = state.guard(&headers) {
        return response;
    }
    Json(state.cart_json()).into_response()
}

async fn upsert_item(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Json(body): Json<UpsertBody>,
) -> Response {
    if let Some(response) = state.guard(&headers) {
        return response;
    }

    let product_id = id_string(&body.product_id);
    {
        let mut inner = state.lock();
        if body.quantity > 0 && !inner.catalog.contains_key(&product_id) {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "message": "The selected product id is invalid." })),
            )
                .into_response();
        }

        inner.upserts.push((product_id.clone(), body.quantity));
        let position = inner
            .lines
            .iter()
            .position(|line| line.product_id == product_id);
        match (position, body.quantity) {
            (Some(index), 0) => {
                inner.lines.remove(index);
            }
            (Some(index), quantity) => {
                if let Some(line) = inner.lines.get_mut(index) {
                    line.quantity = quantity;
                }
            }
            (None, 0) => {}
            (None, quantity) => inner.lines.push(Line {
                product_id,
                quantity,
                specification_id: body.specification_id.as_ref().map(id_string),
            }),
        }
    }

    Json(state.cart_json()).into_response()
}

async fn apply_coupon(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Json(body): Json<CouponBody>,
) -> Response {
    if let Some(response) = state.guard(&headers) {
        return response;
    }

    {
        let mut inner = state.lock();
        let Some(discount) = inner.coupons.get(&body.coupon).copied() else {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "message": "Coupon is not valid." })),
            )
                .into_response();
        };
        inner.applied = Some((body.coupon, discount));
    }

    Json(state.cart_json()).into_response()
}

async fn logout(State(state): State<Arc<ApiState>>) -> StatusCode {
    state.logouts.fetch_add(1, Ordering::SeqCst);
    StatusCode::NO_CONTENT
}

fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/cart", get(get_cart))
        .route("/api/cart/item", post(upsert_item))
        .route("/api/cart/apply-coupon", post(apply_coupon))
        .route("/api/auth/logout", post(logout))
        .with_state(state)
}

// =============================================================================
// FakeCartApi
// =============================================================================

/// Handle to a running fake storefront API.
#[derive(Debug, Clone)]
pub struct FakeCartApi {
    addr: SocketAddr,
    state: Arc<ApiState>,
}

impl FakeCartApi {
    /// Start a server on an ephemeral port accepting `token`.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn start(token: &str) -> Self {
        let state = Arc::new(ApiState {
            token: token.to_string(),
            inner: Mutex::new(Inner::default()),
            logouts: AtomicUsize::new(0),
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap_or_else(|e| panic!("failed to bind fake API: {e}"));
        let addr = listener
            .local_addr()
            .unwrap_or_else(|e| panic!("failed to read fake API address: {e}"));

        let app = router(state.clone());
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "Fake API stopped");
            }
        });

        Self { addr, state }
    }

    /// Base URL to configure the gateway with.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}/api/", self.addr)
    }

    /// Register a product the API will accept.
    pub fn add_product(&self, id: &str, name: &str, price: &str) {
        self.insert_product(id, name, price, None);
    }

    /// Register a product with a sale price.
    pub fn add_discounted_product(&self, id: &str, name: &str, price: &str, sale: &str) {
        self.insert_product(id, name, price, Some(sale));
    }

    fn insert_product(&self, id: &str, name: &str, price: &str, sale: Option<&str>) {
        let entry = CatalogEntry {
            name: name.to_string(),
            price: parse_decimal(price),
            discounted_price: sale.map(parse_decimal),
        };
        self.state.lock().catalog.insert(id.to_string(), entry);
    }

    /// Put a line directly into the server cart.
    pub fn seed_line(&self, id: &str, quantity: u32) {
        self.state.lock().lines.push(Line {
            product_id: id.to_string(),
            quantity,
            specification_id: None,
        });
    }

    /// Accept `code` for a flat discount.
    pub fn add_coupon(&self, code: &str, discount: &str) {
        self.state
            .lock()
            .coupons
            .insert(code.to_string(), parse_decimal(discount));
    }

    /// Answer the next `count` cart requests with `status`.
    pub fn fail_next(&self, status: u16, count: usize) {
        let status = StatusCode::from_u16(status)
            .unwrap_or_else(|e| panic!("invalid status {status}: {e}"));
        self.state.lock().failure = Some(Failure {
            status,
            remaining: count,
        });
    }

    /// `(product_id, quantity)` for each server cart line, in order.
    #[must_use]
    pub fn lines(&self) -> Vec<(String, u32)> {
        self.state
            .lock()
            .lines
            .iter()
            .map(|line| (line.product_id.clone(), line.quantity))
            .collect()
    }

    /// Every upsert received, in order.
    #[must_use]
    pub fn upserts(&self) -> Vec<(String, u32)> {
        self.state.lock().upserts.clone()
    }

    /// Number of logout calls received.
    #[must_use]
    pub fn logout_count(&self) -> usize {
        self.state.logouts.load(Ordering::SeqCst)
    }
}

fn parse_decimal(raw: &str) -> Decimal {
    raw.parse()
        .unwrap_or_else(|e| panic!("invalid decimal {raw:?}: {e}"))
}
