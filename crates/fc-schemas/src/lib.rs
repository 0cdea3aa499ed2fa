//! Shared entity and view types for the food-court backend.
//!
//! Entities here are the authoritative rows owned by `fc-store`; view types
//! are the JSON shapes returned to callers.  No business logic lives in this
//! crate beyond status parsing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fc_money::Cents;

mod error;
pub use error::DomainError;

/// Row identifier type shared by every table (sequential, store-allocated).
pub type Id = i64;

// ---------------------------------------------------------------------------
// Catalog entities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vendor {
    pub id: Id,
    /// Unique display name.
    pub name: String,
    pub stall_no: String,
    /// Tax registration identifier (opaque here; flat-rate GST only).
    pub gstin: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: Id,
    pub vendor_id: Id,
    pub item_name: String,
    /// Current list price.  Edits never rewrite existing snapshots.
    pub price: Cents,
    pub is_active: bool,
}

// ---------------------------------------------------------------------------
// Cart entities
// ---------------------------------------------------------------------------

/// Whether a cart can still accept lines and be checked out.
///
/// `CheckedOut` is the double-checkout guard: once an order has been created
/// from a cart, the cart is consumed and a retried checkout returns the same
/// order instead of creating a second one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CartState {
    Open,
    CheckedOut { order_id: Id },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    pub id: Id,
    /// Opaque owner token (guest or authenticated).
    pub user_token: String,
    pub state: CartState,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    pub id: Id,
    pub cart_id: Id,
    pub vendor_id: Id,
    pub menu_id: Id,
    /// Always >= 1; duplicate adds merge into this field.
    pub qty: i64,
    /// Menu price captured at first add; authoritative for billing even if
    /// the menu price later changes.
    pub price_snapshot: Cents,
}

// ---------------------------------------------------------------------------
// Order entities
// ---------------------------------------------------------------------------

/// Closed order-lifecycle status set.  Unknown strings are rejected at the
/// boundary via [`OrderStatus::parse`]; nothing deeper matches on strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Created,
    Paid,
    Preparing,
    Ready,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "created",
            OrderStatus::Paid => "paid",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Parse a wire status string.  `InvalidInput` for anything unknown.
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s {
            "created" => Ok(OrderStatus::Created),
            "paid" => Ok(OrderStatus::Paid),
            "preparing" => Ok(OrderStatus::Preparing),
            "ready" => Ok(OrderStatus::Ready),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(DomainError::InvalidInput(format!(
                "invalid status '{other}'; must be one of created, paid, preparing, ready, completed, cancelled"
            ))),
        }
    }

    /// Returns `true` if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Id,
    /// Provenance only — totals are decoupled from the cart after checkout.
    pub cart_id: Id,
    pub status: OrderStatus,
    pub total_gross: Cents,
    pub total_tax: Cents,
    /// Equal to `total_gross` (no discounts modeled).
    pub total_net: Cents,
    /// `"STUB-{order_id}"` placeholder for a future gateway.
    pub payment_id: Option<String>,
    pub table_no: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: Id,
    pub order_id: Id,
    pub vendor_id: Id,
    pub menu_id: Id,
    pub qty: i64,
    /// Unit price copied from the cart line's snapshot.
    pub price: Cents,
    /// Per-line GST, rounded independently of the order-level tax.
    pub tax: Cents,
    pub prepared_at: Option<DateTime<Utc>>,
    pub ready_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// User entity (auth collaborator)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Id,
    /// Stored lowercased; unique.
    pub email: String,
    pub password_hash: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// View types
// ---------------------------------------------------------------------------

/// One cart line joined with live display names.  Only `price_each` /
/// `line_total` come from the snapshot; names reflect the current catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLineView {
    pub id: Id,
    pub vendor_id: Id,
    pub menu_id: Id,
    pub item_name: String,
    pub qty: i64,
    pub price_each: Cents,
    pub line_total: Cents,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartView {
    pub cart_id: Id,
    pub user_token: String,
    pub items: Vec<CartLineView>,
    /// Σ(qty × price_snapshot) over all lines, exact in cents.
    pub subtotal: Cents,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSummary {
    pub order_id: Id,
    pub status: OrderStatus,
    pub payable_amount: Cents,
    pub payment_link: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStatusView {
    pub order_id: Id,
    pub status: OrderStatus,
    pub total_gross: Cents,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLineBrief {
    pub vendor_name: String,
    pub item_name: String,
    pub qty: i64,
    /// price × qty + tax for this line.
    pub line_total: Cents,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderHistoryItem {
    pub order_id: Id,
    pub status: OrderStatus,
    pub total_gross: Cents,
    pub created_at: DateTime<Utc>,
    pub payment_id: Option<String>,
    /// Deduplicated, sorted vendor display names.
    pub vendors: Vec<String>,
    pub lines: Vec<OrderLineBrief>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderHistory {
    pub user_token: String,
    pub orders: Vec<OrderHistoryItem>,
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        for s in ["created", "paid", "preparing", "ready", "completed", "cancelled"] {
            let parsed = OrderStatus::parse(s).unwrap();
            assert_eq!(parsed.as_str(), s);
        }
    }

    #[test]
    fn unknown_status_is_invalid_input() {
        let err = OrderStatus::parse("shipped").unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[test]
    fn terminal_statuses() {
        assert!(OrderStatus::Completed.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Created.is_terminal());
        assert!(!OrderStatus::Ready.is_terminal());
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&OrderStatus::Preparing).unwrap();
        assert_eq!(json, "\"preparing\"");
    }

    #[test]
    fn cart_state_carries_order_id() {
        let s = CartState::CheckedOut { order_id: 7 };
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["state"], "checked_out");
        assert_eq!(json["order_id"], 7);
    }
}
