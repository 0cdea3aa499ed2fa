//! Checkout Engine.
//!
//! Converts an Open cart into an immutable order:
//!
//! - Every cart line is copied into an order line (vendor, menu, qty, unit
//!   price from the snapshot) — never recalculated from current menu prices.
//! - GST is applied **twice, independently**: per line on `price × qty`, and
//!   at order level on the full subtotal.  The order-level tax is NOT the
//!   sum of line taxes; the two can diverge by rounding across lines and
//!   are deliberately never reconciled.
//! - The cart is marked `CheckedOut { order_id }`.  A retried checkout for
//!   a token whose newest cart is already checked out returns the same
//!   order (idempotent single-flight, closing the double-order gap).
//!
//! Payment is a stub: `payment_id = "STUB-{order_id}"` plus a non-functional
//! link.  Real gateway integration is out of scope.

use chrono::Utc;
use tracing::info;

use fc_money::{Cents, GST_RATE_BPS};
use fc_schemas::{
    CartState, CheckoutSummary, DomainError, Order, OrderLine, OrderStatus,
};
use fc_store::Tables;

/// Base of the stub payment link returned to the client.
pub const PAYMENT_LINK_BASE: &str = "https://example.com/pay";

/// Check out the token's Open cart into a new order.
///
/// # Errors
/// `InvalidState` when the token has no Open cart with at least one line
/// (unless the newest cart is already checked out, which returns the
/// existing order's summary instead).
pub fn checkout(
    tx: &mut Tables,
    token: &str,
    table_no: Option<&str>,
) -> Result<CheckoutSummary, DomainError> {
    let open = tx.open_cart_for_token(token).map(|c| c.id);

    let cart_id = match open {
        Some(id) if !tx.lines_of_cart(id).is_empty() => id,
        Some(_) | None => {
            // Idempotent retry: the newest cart being consumed means this
            // token's checkout already happened — hand back that order.
            if open.is_none() {
                if let Some(CartState::CheckedOut { order_id }) =
                    tx.latest_cart_for_token(token).map(|c| c.state)
                {
                    info!(order_id, "checkout retry returned existing order");
                    return summary_of(tx, order_id);
                }
            }
            return Err(DomainError::InvalidState("Cart is empty".to_string()));
        }
    };

    // Create the order row first so lines and the payment stub can
    // reference its id.
    let order_id = tx.insert_order(Order {
        id: 0, // store-allocated
        cart_id,
        status: OrderStatus::Created,
        total_gross: Cents::ZERO,
        total_tax: Cents::ZERO,
        total_net: Cents::ZERO,
        payment_id: None,
        table_no: table_no.map(str::to_string),
        created_at: Utc::now(),
    });

    let overflow = || DomainError::InvalidInput("amount overflow".to_string());

    let mut subtotal = Cents::ZERO;
    let lines: Vec<_> = tx.lines_of_cart(cart_id).into_iter().cloned().collect();
    for line in &lines {
        let line_amount = line
            .price_snapshot
            .checked_mul_qty(line.qty)
            .ok_or_else(overflow)?;
        subtotal += line_amount;
        // Per-line GST rounds on the line amount alone.
        let line_tax = line_amount.tax_at_bps(GST_RATE_BPS).ok_or_else(overflow)?;
        tx.insert_order_line(OrderLine {
            id: 0, // store-allocated
            order_id,
            vendor_id: line.vendor_id,
            menu_id: line.menu_id,
            qty: line.qty,
            price: line.price_snapshot,
            tax: line_tax,
            prepared_at: None,
            ready_at: None,
        });
    }

    // Order-level GST rounds on the subtotal independently.
    let total_tax = subtotal.tax_at_bps(GST_RATE_BPS).ok_or_else(overflow)?;
    let total_gross = subtotal + total_tax;

    let payment_id = format!("STUB-{order_id}");
    {
        let order = tx.order_mut(order_id)?;
        order.total_gross = total_gross;
        order.total_tax = total_tax;
        order.total_net = total_gross; // no discounts modeled
        order.payment_id = Some(payment_id);
    }

    // Consume the cart; the next cart access opens a fresh one.
    if let Some(cart) = tx.carts.get_mut(&cart_id) {
        cart.state = CartState::CheckedOut { order_id };
    }

    info!(
        order_id,
        cart_id,
        lines = lines.len(),
        %total_gross,
        "checkout created order"
    );
    summary_of(tx, order_id)
}

fn summary_of(tx: &Tables, order_id: i64) -> Result<CheckoutSummary, DomainError> {
    let order = tx.order(order_id)?;
    let payment_id = order.payment_id.as_deref().unwrap_or_default();
    Ok(CheckoutSummary {
        order_id: order.id,
        status: order.status,
        payable_amount: order.total_gross,
        payment_link: format!("{PAYMENT_LINK_BASE}/{payment_id}"),
    })
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use fc_cart::{add_item, get_cart};
    use fc_schemas::Id;
    use fc_store::seed::seed_demo_catalog;

    fn seeded() -> Tables {
        let mut t = Tables::default();
        seed_demo_catalog(&mut t);
        t
    }

    fn menu_id(t: &Tables, name: &str) -> Id {
        t.menus
            .values()
            .find(|m| m.item_name == name)
            .map(|m| m.id)
            .unwrap()
    }

    #[test]
    fn empty_cart_checkout_is_invalid_state() {
        let mut t = seeded();
        // No cart at all.
        assert!(matches!(
            checkout(&mut t, "nobody", None),
            Err(DomainError::InvalidState(_))
        ));
        // An Open cart with zero lines.
        get_cart(&mut t, "browser").unwrap();
        assert!(matches!(
            checkout(&mut t, "browser", None),
            Err(DomainError::InvalidState(_))
        ));
    }

    #[test]
    fn single_line_worked_example() {
        // 199.00 × 2 → subtotal 398.00, tax 19.90, gross 417.90
        let mut t = seeded();
        let m = menu_id(&t, "Margherita");
        add_item(&mut t, "g", m, 2).unwrap();

        let summary = checkout(&mut t, "g", None).unwrap();
        assert_eq!(summary.payable_amount, Cents::new(41_790));
        assert_eq!(summary.status, OrderStatus::Created);

        let order = t.order(summary.order_id).unwrap();
        assert_eq!(order.total_tax, Cents::new(1_990));
        assert_eq!(order.total_net, order.total_gross);
    }

    #[test]
    fn two_line_worked_example_with_independent_line_taxes() {
        // 149.00... the catalog has no 149 item; use snapshot override via a
        // dedicated menu entry instead.
        let mut t = seeded();
        let v = t.insert_vendor("Test Stall", "Z9", "29TEST");
        let m1 = t.insert_menu_item(v, "Combo", Cents::new(14_900), true);
        let m2 = t.insert_menu_item(v, "Side", Cents::new(5_900), true);

        add_item(&mut t, "g", m1, 1).unwrap();
        add_item(&mut t, "g", m2, 3).unwrap();

        let summary = checkout(&mut t, "g", None).unwrap();
        let order = t.order(summary.order_id).unwrap();
        // subtotal 326.00 → tax 16.30, gross 342.30
        assert_eq!(order.total_tax, Cents::new(1_630));
        assert_eq!(order.total_gross, Cents::new(34_230));

        // Per-line taxes computed independently: 149.00*5% = 7.45,
        // 177.00*5% = 8.85.
        let mut line_taxes: Vec<Cents> = t
            .lines_of_order(summary.order_id)
            .iter()
            .map(|l| l.tax)
            .collect();
        line_taxes.sort();
        assert_eq!(line_taxes, vec![Cents::new(745), Cents::new(885)]);
    }

    #[test]
    fn exactly_one_order_line_per_cart_line() {
        let mut t = seeded();
        let pizza = menu_id(&t, "Margherita");
        let puri = menu_id(&t, "Pani Puri");
        add_item(&mut t, "g", pizza, 2).unwrap();
        add_item(&mut t, "g", puri, 1).unwrap();

        let summary = checkout(&mut t, "g", None).unwrap();
        assert_eq!(t.lines_of_order(summary.order_id).len(), 2);
    }

    #[test]
    fn order_lines_keep_snapshot_not_current_price() {
        let mut t = seeded();
        let m = menu_id(&t, "Margherita");
        add_item(&mut t, "g", m, 1).unwrap();
        t.menus.get_mut(&m).unwrap().price = Cents::new(99_900);

        let summary = checkout(&mut t, "g", None).unwrap();
        let lines = t.lines_of_order(summary.order_id);
        assert_eq!(lines[0].price, Cents::new(19_900));
    }

    #[test]
    fn checkout_marks_cart_consumed_and_reopens_lazily() {
        let mut t = seeded();
        let m = menu_id(&t, "Margherita");
        let before = add_item(&mut t, "g", m, 1).unwrap();

        let summary = checkout(&mut t, "g", None).unwrap();
        assert_eq!(
            t.carts.get(&before.cart_id).unwrap().state,
            CartState::CheckedOut {
                order_id: summary.order_id
            }
        );

        // Next access opens a fresh, empty cart.
        let view = get_cart(&mut t, "g").unwrap();
        assert_ne!(view.cart_id, before.cart_id);
        assert!(view.items.is_empty());
    }

    #[test]
    fn retried_checkout_returns_same_order() {
        let mut t = seeded();
        let m = menu_id(&t, "Margherita");
        add_item(&mut t, "g", m, 1).unwrap();

        let first = checkout(&mut t, "g", None).unwrap();
        let second = checkout(&mut t, "g", None).unwrap();
        assert_eq!(first.order_id, second.order_id, "retry must not double-order");
        assert_eq!(t.orders.len(), 1);
    }

    #[test]
    fn payment_stub_references_order_id() {
        let mut t = seeded();
        let m = menu_id(&t, "Pani Puri");
        add_item(&mut t, "g", m, 1).unwrap();

        let summary = checkout(&mut t, "g", Some("T-5")).unwrap();
        let order = t.order(summary.order_id).unwrap();
        let expected = format!("STUB-{}", summary.order_id);
        assert_eq!(order.payment_id.as_deref(), Some(expected.as_str()));
        assert_eq!(
            summary.payment_link,
            format!("https://example.com/pay/{expected}")
        );
        assert_eq!(order.table_no.as_deref(), Some("T-5"));
    }

    #[test]
    fn order_totals_decoupled_from_cart_after_checkout() {
        let mut t = seeded();
        let m = menu_id(&t, "Margherita");
        add_item(&mut t, "g", m, 2).unwrap();
        let summary = checkout(&mut t, "g", None).unwrap();
        let gross_before = t.order(summary.order_id).unwrap().total_gross;

        // New cart activity must not touch the order.
        add_item(&mut t, "g", m, 5).unwrap();
        assert_eq!(t.order(summary.order_id).unwrap().total_gross, gross_before);
    }
}
