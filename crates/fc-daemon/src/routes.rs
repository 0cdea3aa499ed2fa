//! Axum router and all HTTP handlers for fc-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers.  All handlers are `pub(crate)` so the scenario tests in
//! `tests/` can compose the router directly.
//!
//! Handlers stay thin: decode the request, run one core operation inside a
//! single `Store::read`/`Store::write`, encode the result.  Domain errors map
//! onto status codes via [`domain_error_response`].

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, patch, post},
    Json, Router,
};
use chrono::Utc;
use futures_util::{Stream, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::info;

use fc_schemas::{DomainError, Id, MenuItem, OrderStatus, Vendor};

use crate::{
    api_types::{
        AddMenuItemRequest, AddToCartRequest, AnalyticsQuery, AuthResponse, CartQuery,
        CheckoutRequest, ErrorBody, HealthResponse, HistoryQuery, LoginRequest, MenuItemDeleted,
        MenusQuery, RemoveFromCartRequest, SignupRequest, UpdateMenuItemRequest,
        UpdateStatusRequest, VendorOrdersQuery,
    },
    auth,
    state::{self, AppState, BusMsg},
};

const DEFAULT_HISTORY_LIMIT: usize = 20;
const DEFAULT_VENDOR_ORDERS_LIMIT: usize = 50;
const DEFAULT_ANALYTICS_DAYS: i64 = 7;

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/stream", get(stream))
        .route("/catalog/vendors", get(list_vendors))
        .route("/catalog/menus", get(list_menus))
        .route("/cart", get(get_cart))
        .route("/cart/add", post(cart_add))
        .route("/cart/remove", post(cart_remove))
        .route("/checkout", post(checkout))
        // `/orders/history` must register before `/orders/:id` so the word
        // "history" is never captured as an order id.
        .route("/orders/history", get(order_history))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/mark-paid", post(mark_paid))
        .route(
            "/vendor/:vendor_id/orders/:order_id/status",
            patch(update_status),
        )
        .route(
            "/vendor/:vendor_id/menu",
            get(vendor_menu).post(add_menu_item),
        )
        .route(
            "/vendor/:vendor_id/menu/:menu_id",
            patch(update_menu_item).delete(delete_menu_item),
        )
        .route("/vendor/:vendor_id/dashboard", get(vendor_dashboard))
        .route("/vendor/:vendor_id/stats", get(vendor_stats))
        .route("/vendor/:vendor_id/orders", get(vendor_orders))
        .route("/vendor/:vendor_id/analytics", get(vendor_analytics))
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

fn domain_error_response(err: DomainError) -> Response {
    let status = match err {
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
        DomainError::InvalidState(_) | DomainError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
        DomainError::Conflict(_) => StatusCode::CONFLICT,
    };
    (
        status,
        Json(ErrorBody {
            error: err.message().to_string(),
            kind: err.kind().to_string(),
        }),
    )
        .into_response()
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorBody {
            error: "Invalid email or password".to_string(),
            kind: "unauthorized".to_string(),
        }),
    )
        .into_response()
}

/// Collapse the common `Result<View, DomainError>` handler tail.
fn json_or_error<T: serde::Serialize>(res: Result<T, DomainError>) -> Response {
    match res {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(err) => domain_error_response(err),
    }
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service,
            version: st.build.version,
        }),
    )
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

pub(crate) async fn list_vendors(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    let vendors: Vec<Vendor> = st
        .store
        .read(|tx| tx.vendors.values().cloned().collect());
    (StatusCode::OK, Json(vendors))
}

/// Active menu items only; `vendor_id` narrows to one stall.
pub(crate) async fn list_menus(
    State(st): State<Arc<AppState>>,
    Query(q): Query<MenusQuery>,
) -> impl IntoResponse {
    let menus: Vec<MenuItem> = st.store.read(|tx| {
        tx.menus
            .values()
            .filter(|m| m.is_active)
            .filter(|m| q.vendor_id.map_or(true, |v| m.vendor_id == v))
            .cloned()
            .collect()
    });
    (StatusCode::OK, Json(menus))
}

// ---------------------------------------------------------------------------
// Cart
// ---------------------------------------------------------------------------

pub(crate) async fn get_cart(
    State(st): State<Arc<AppState>>,
    Query(q): Query<CartQuery>,
) -> Response {
    // A write, not a read: fetching a cart creates it lazily.
    json_or_error(st.store.write(|tx| fc_cart::get_cart(tx, &q.user_token)))
}

pub(crate) async fn cart_add(
    State(st): State<Arc<AppState>>,
    Json(req): Json<AddToCartRequest>,
) -> Response {
    json_or_error(
        st.store
            .write(|tx| fc_cart::add_item(tx, &req.user_token, req.menu_id, req.qty)),
    )
}

pub(crate) async fn cart_remove(
    State(st): State<Arc<AppState>>,
    Json(req): Json<RemoveFromCartRequest>,
) -> Response {
    json_or_error(
        st.store
            .write(|tx| fc_cart::remove_item(tx, &req.user_token, req.cart_line_id)),
    )
}

// ---------------------------------------------------------------------------
// POST /checkout
// ---------------------------------------------------------------------------

pub(crate) async fn checkout(
    State(st): State<Arc<AppState>>,
    Json(req): Json<CheckoutRequest>,
) -> Response {
    let res = st
        .store
        .write(|tx| fc_checkout::checkout(tx, &req.user_token, req.table_no.as_deref()));
    match res {
        Ok(summary) => {
            info!(order_id = summary.order_id, "checkout");
            let _ = st.bus.send(BusMsg::OrderCreated {
                order_id: summary.order_id,
            });
            state::mirror_order(&st, summary.order_id);
            (StatusCode::OK, Json(summary)).into_response()
        }
        Err(err) => domain_error_response(err),
    }
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

pub(crate) async fn get_order(
    State(st): State<Arc<AppState>>,
    Path(order_id): Path<Id>,
) -> Response {
    json_or_error(st.store.read(|tx| fc_orders::order_view(tx, order_id)))
}

pub(crate) async fn order_history(
    State(st): State<Arc<AppState>>,
    Query(q): Query<HistoryQuery>,
) -> Response {
    let limit = q.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    json_or_error(
        st.store
            .read(|tx| fc_orders::order_history(tx, &q.user_token, limit)),
    )
}

pub(crate) async fn mark_paid(State(st): State<Arc<AppState>>, Path(order_id): Path<Id>) -> Response {
    let res = st.store.write(|tx| fc_orders::mark_paid(tx, order_id));
    match res {
        Ok(view) => {
            info!(order_id, status = view.status.as_str(), "mark-paid");
            let _ = st.bus.send(BusMsg::StatusChanged {
                order_id,
                status: view.status,
            });
            state::mirror_order(&st, order_id);
            (StatusCode::OK, Json(view)).into_response()
        }
        Err(err) => domain_error_response(err),
    }
}

// ---------------------------------------------------------------------------
// PATCH /vendor/:vendor_id/orders/:order_id/status
// ---------------------------------------------------------------------------

pub(crate) async fn update_status(
    State(st): State<Arc<AppState>>,
    Path((vendor_id, order_id)): Path<(Id, Id)>,
    Json(req): Json<UpdateStatusRequest>,
) -> Response {
    let res = st
        .store
        .write(|tx| fc_orders::update_status(tx, vendor_id, order_id, &req.status));
    match res {
        Ok(view) => {
            info!(
                vendor_id,
                order_id,
                status = view.status.as_str(),
                "status update"
            );
            let _ = st.bus.send(BusMsg::StatusChanged {
                order_id,
                status: view.status,
            });
            state::mirror_order(&st, order_id);
            (StatusCode::OK, Json(view)).into_response()
        }
        Err(err) => domain_error_response(err),
    }
}

// ---------------------------------------------------------------------------
// Vendor menu management
// ---------------------------------------------------------------------------

pub(crate) async fn vendor_menu(
    State(st): State<Arc<AppState>>,
    Path(vendor_id): Path<Id>,
) -> Response {
    json_or_error(st.store.read(|tx| fc_vendor::vendor_menu(tx, vendor_id)))
}

pub(crate) async fn add_menu_item(
    State(st): State<Arc<AppState>>,
    Path(vendor_id): Path<Id>,
    Json(req): Json<AddMenuItemRequest>,
) -> Response {
    json_or_error(st.store.write(|tx| {
        fc_vendor::add_menu_item(tx, vendor_id, &req.item_name, req.price, req.is_active)
    }))
}

pub(crate) async fn update_menu_item(
    State(st): State<Arc<AppState>>,
    Path((vendor_id, menu_id)): Path<(Id, Id)>,
    Json(req): Json<UpdateMenuItemRequest>,
) -> Response {
    json_or_error(st.store.write(|tx| {
        fc_vendor::update_menu_item(tx, vendor_id, menu_id, req.price, req.is_active)
    }))
}

pub(crate) async fn delete_menu_item(
    State(st): State<Arc<AppState>>,
    Path((vendor_id, menu_id)): Path<(Id, Id)>,
) -> Response {
    let res = st
        .store
        .write(|tx| fc_vendor::delete_menu_item(tx, vendor_id, menu_id));
    match res {
        Ok(()) => (StatusCode::OK, Json(MenuItemDeleted { deleted: true, menu_id })).into_response(),
        Err(err) => domain_error_response(err),
    }
}

// ---------------------------------------------------------------------------
// Vendor read aggregates
// ---------------------------------------------------------------------------

pub(crate) async fn vendor_dashboard(
    State(st): State<Arc<AppState>>,
    Path(vendor_id): Path<Id>,
) -> Response {
    json_or_error(
        st.store
            .read(|tx| fc_vendor::dashboard(tx, vendor_id, Utc::now())),
    )
}

pub(crate) async fn vendor_stats(
    State(st): State<Arc<AppState>>,
    Path(vendor_id): Path<Id>,
) -> Response {
    json_or_error(st.store.read(|tx| fc_vendor::stats(tx, vendor_id, Utc::now())))
}

pub(crate) async fn vendor_orders(
    State(st): State<Arc<AppState>>,
    Path(vendor_id): Path<Id>,
    Query(q): Query<VendorOrdersQuery>,
) -> Response {
    let status_filter = match q.status.as_deref() {
        Some(s) => match OrderStatus::parse(s) {
            Ok(parsed) => Some(parsed),
            Err(err) => return domain_error_response(err),
        },
        None => None,
    };
    let limit = q.limit.unwrap_or(DEFAULT_VENDOR_ORDERS_LIMIT);
    json_or_error(
        st.store
            .read(|tx| fc_vendor::vendor_orders(tx, vendor_id, status_filter, limit)),
    )
}

pub(crate) async fn vendor_analytics(
    State(st): State<Arc<AppState>>,
    Path(vendor_id): Path<Id>,
    Query(q): Query<AnalyticsQuery>,
) -> Response {
    let days = q.days.unwrap_or(DEFAULT_ANALYTICS_DAYS).max(1);
    json_or_error(
        st.store
            .read(|tx| fc_vendor::analytics(tx, vendor_id, days, Utc::now())),
    )
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

pub(crate) async fn signup(
    State(st): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Response {
    let res = st.store.write(|tx| {
        auth::signup(
            tx,
            &req.email,
            &req.password,
            req.display_name.as_deref(),
            req.guest_token.as_deref(),
        )
    });
    match res {
        Ok(session) => {
            info!(user_id = session.user.id, "signup");
            (
                StatusCode::OK,
                Json(AuthResponse {
                    user_token: session.user_token,
                    user_id: session.user.id,
                    email: session.user.email,
                    display_name: session.user.display_name,
                }),
            )
                .into_response()
        }
        Err(err) => domain_error_response(err),
    }
}

pub(crate) async fn login(
    State(st): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Response {
    // `write` because a successful login migrates guest carts.
    let res = st.store.write(|tx| {
        Ok(auth::login(
            tx,
            &req.email,
            &req.password,
            req.guest_token.as_deref(),
        ))
    });
    match res {
        Ok(Some(session)) => {
            info!(user_id = session.user.id, "login");
            (
                StatusCode::OK,
                Json(AuthResponse {
                    user_token: session.user_token,
                    user_id: session.user.id,
                    email: session.user.email,
                    display_name: session.user.display_name,
                }),
            )
                .into_response()
        }
        Ok(None) => unauthorized(),
        Err(err) => domain_error_response(err),
    }
}

// ---------------------------------------------------------------------------
// GET /stream  (SSE)
// ---------------------------------------------------------------------------

pub(crate) async fn stream(State(st): State<Arc<AppState>>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));
    headers.insert("Connection", HeaderValue::from_static("keep-alive"));

    let rx = st.bus.subscribe();
    let events = broadcast_to_sse(rx);

    (headers, Sse::new(events).keep_alive(KeepAlive::new())).into_response()
}

fn broadcast_to_sse(
    rx: broadcast::Receiver<BusMsg>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    BroadcastStream::new(rx).filter_map(|msg| async move {
        match msg {
            Ok(m) => {
                let event_name = match &m {
                    BusMsg::Heartbeat { .. } => "heartbeat",
                    BusMsg::OrderCreated { .. } => "order_created",
                    BusMsg::StatusChanged { .. } => "status_changed",
                };
                let data = serde_json::to_string(&m).ok()?;
                Some(Ok(Event::default().event(event_name).data(data)))
            }
            Err(_) => None, // lagged / closed
        }
    })
}
