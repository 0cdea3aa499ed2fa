//! Request and response types for all fc-daemon HTTP endpoints.
//!
//! These types are `Serialize + Deserialize` so they can be JSON-encoded by
//! Axum and decoded by tests.  No business logic lives here; the view types
//! returned by the core crates (`CartView`, `CheckoutSummary`, ...) are used
//! directly as response bodies.

use serde::{Deserialize, Serialize};

use fc_money::Cents;
use fc_schemas::Id;

// ---------------------------------------------------------------------------
// /health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// Error body (all non-2xx responses)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    /// Machine tag: "not_found" | "invalid_state" | "invalid_input" |
    /// "forbidden" | "conflict" | "unauthorized"
    pub kind: String,
}

// ---------------------------------------------------------------------------
// Cart
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddToCartRequest {
    pub user_token: String,
    pub menu_id: Id,
    #[serde(default = "default_qty")]
    pub qty: i64,
}

fn default_qty() -> i64 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveFromCartRequest {
    pub user_token: String,
    pub cart_line_id: Id,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CartQuery {
    pub user_token: String,
}

// ---------------------------------------------------------------------------
// Checkout & orders
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub user_token: String,
    pub table_no: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryQuery {
    pub user_token: String,
    pub limit: Option<usize>,
}

// ---------------------------------------------------------------------------
// Vendor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VendorOrdersQuery {
    pub status: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsQuery {
    pub days: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MenusQuery {
    pub vendor_id: Option<Id>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddMenuItemRequest {
    pub item_name: String,
    pub price: Cents,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Partial edit: absent fields stay as they are.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateMenuItemRequest {
    pub price: Option<Cents>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItemDeleted {
    pub deleted: bool,
    pub menu_id: Id,
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
    /// Guest token whose carts migrate to the new user token.
    pub guest_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub guest_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Use this instead of the guest token going forward.
    pub user_token: String,
    pub user_id: Id,
    pub email: String,
    pub display_name: String,
}
