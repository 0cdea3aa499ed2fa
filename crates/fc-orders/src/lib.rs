//! Order Lifecycle.
//!
//! Orders are immutable after checkout except for their status and the
//! per-line prepared/ready timestamps.  Status writes go through the
//! transition table in [`transitions`]; vendor-initiated writes additionally
//! require the vendor to hold at least one line in the order.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use fc_schemas::{
    DomainError, Id, OrderHistory, OrderHistoryItem, OrderLineBrief, OrderStatus, OrderStatusView,
};
use fc_store::Tables;

pub mod transitions;

use transitions::Transition;

/// Status view of a single order.  `NotFound` if absent.
pub fn order_view(tx: &Tables, order_id: Id) -> Result<OrderStatusView, DomainError> {
    let order = tx.order(order_id)?;
    Ok(OrderStatusView {
        order_id: order.id,
        status: order.status,
        total_gross: order.total_gross,
    })
}

/// Payment-webhook stand-in: move the order to `paid`.
///
/// `created → paid` succeeds; re-marking an already-paid order is an
/// idempotent no-op; any later state rejects with `InvalidState`.
pub fn mark_paid(tx: &mut Tables, order_id: Id) -> Result<OrderStatusView, DomainError> {
    let current = tx.order(order_id)?.status;
    match transitions::check(current, OrderStatus::Paid)? {
        Transition::Noop => {
            warn!(order_id, "mark_paid on already-paid order (noop)");
        }
        Transition::Advance => {
            tx.order_mut(order_id)?.status = OrderStatus::Paid;
            info!(order_id, "order marked paid");
        }
    }
    order_view(tx, order_id)
}

/// Vendor-initiated status update.
///
/// Check order mirrors the original endpoint: vendor existence, order
/// existence, vendor authorization (at least one line in the order), status
/// string validity, then the transition table.  Entering `preparing` /
/// `ready` stamps `prepared_at` / `ready_at` on the acting vendor's lines
/// (first write wins).
pub fn update_status(
    tx: &mut Tables,
    vendor_id: Id,
    order_id: Id,
    new_status: &str,
) -> Result<OrderStatusView, DomainError> {
    tx.vendor(vendor_id)?;
    let current = tx.order(order_id)?.status;

    let vendor_has_line = tx
        .lines_of_order(order_id)
        .iter()
        .any(|l| l.vendor_id == vendor_id);
    if !vendor_has_line {
        return Err(DomainError::Forbidden(
            "Vendor not authorized for this order".to_string(),
        ));
    }

    let requested = OrderStatus::parse(new_status)?;

    if let Transition::Advance = transitions::check(current, requested)? {
        tx.order_mut(order_id)?.status = requested;
        stamp_vendor_lines(tx, vendor_id, order_id, requested, Utc::now());
        info!(
            vendor_id,
            order_id,
            from = current.as_str(),
            to = requested.as_str(),
            "order status updated"
        );
    }
    order_view(tx, order_id)
}

/// Record when this vendor's portion of the order started preparing / became
/// ready.  Timestamps are write-once.
fn stamp_vendor_lines(
    tx: &mut Tables,
    vendor_id: Id,
    order_id: Id,
    status: OrderStatus,
    now: DateTime<Utc>,
) {
    for line in tx.order_lines.values_mut() {
        if line.order_id != order_id || line.vendor_id != vendor_id {
            continue;
        }
        match status {
            OrderStatus::Preparing => line.prepared_at.get_or_insert(now),
            OrderStatus::Ready => line.ready_at.get_or_insert(now),
            _ => continue,
        };
    }
}

/// Past orders for every cart owned by `token`, newest first.
///
/// Each item carries deduplicated sorted vendor names and per-line briefs
/// where `line_total = price × qty + tax`.
pub fn order_history(tx: &Tables, token: &str, limit: usize) -> Result<OrderHistory, DomainError> {
    let cart_ids: Vec<Id> = tx
        .carts
        .values()
        .filter(|c| c.user_token == token)
        .map(|c| c.id)
        .collect();

    let mut orders: Vec<_> = tx
        .orders
        .values()
        .filter(|o| cart_ids.contains(&o.cart_id))
        .collect();
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    orders.truncate(limit);

    let mut items = Vec::with_capacity(orders.len());
    for order in orders {
        let mut vendors: Vec<String> = Vec::new();
        let mut lines = Vec::new();
        for ol in tx.lines_of_order(order.id) {
            let vendor = tx.vendor(ol.vendor_id)?;
            let menu = tx.menu_item(ol.menu_id)?;
            if !vendors.contains(&vendor.name) {
                vendors.push(vendor.name.clone());
            }
            let amount = ol
                .price
                .checked_mul_qty(ol.qty)
                .ok_or_else(|| DomainError::InvalidInput("amount overflow".to_string()))?;
            lines.push(OrderLineBrief {
                vendor_name: vendor.name.clone(),
                item_name: menu.item_name.clone(),
                qty: ol.qty,
                line_total: amount + ol.tax,
            });
        }
        vendors.sort();
        items.push(OrderHistoryItem {
            order_id: order.id,
            status: order.status,
            total_gross: order.total_gross,
            created_at: order.created_at,
            payment_id: order.payment_id.clone(),
            vendors,
            lines,
        });
    }

    Ok(OrderHistory {
        user_token: token.to_string(),
        orders: items,
    })
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
