//! Vendor Operations: menu management and derived read aggregates.
//!
//! The aggregates are pure queries over orders/lines/menus scoped by vendor
//! and a time window; a reporting layer over the Order Lifecycle's data.
//! Menu writes are the one mutation vendors own, and they never touch
//! existing cart snapshots or order lines.
//!
//! "Today" means the UTC calendar day of the supplied `now`; callers pass
//! `Utc::now()` in production and pinned instants in tests.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use tracing::info;

use fc_money::Cents;
use fc_schemas::{DomainError, Id, MenuItem, Order, OrderStatus};
use fc_store::Tables;

// ---------------------------------------------------------------------------
// View types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopItem {
    pub name: String,
    pub orders: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorDashboard {
    pub total_orders_today: i64,
    pub total_revenue_today: Cents,
    pub pending_orders: i64,
    pub top_items: Vec<TopItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorStats {
    pub total_orders: i64,
    pub completed_orders: i64,
    pub revenue: Cents,
    pub pending_orders: i64,
    pub menu_items: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorOrderItem {
    pub name: String,
    pub qty: i64,
    pub price: Cents,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorOrderDetail {
    pub order_id: Id,
    pub status: OrderStatus,
    pub total_gross: Cents,
    /// Only this vendor's portion of the order.
    pub items: Vec<VendorOrderItem>,
    pub created_at: DateTime<Utc>,
    pub table_no: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyBucket {
    pub date: NaiveDate,
    pub revenue: Cents,
    pub orders: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorAnalytics {
    pub daily_data: Vec<DailyBucket>,
    pub period_days: i64,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Orders containing at least one of this vendor's lines, newest first.
fn orders_involving<'a>(tx: &'a Tables, vendor_id: Id) -> Vec<&'a Order> {
    let mut orders: Vec<&Order> = tx
        .orders
        .values()
        .filter(|o| {
            tx.lines_of_order(o.id)
                .iter()
                .any(|l| l.vendor_id == vendor_id)
        })
        .collect();
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    orders
}

fn is_today(order: &Order, now: DateTime<Utc>) -> bool {
    order.created_at.date_naive() == now.date_naive()
}

/// An order still waiting on the kitchen: created or preparing.
fn is_pending(order: &Order) -> bool {
    matches!(order.status, OrderStatus::Created | OrderStatus::Preparing)
}

/// The menu item, only if it belongs to this vendor.
fn owned_menu_item(tx: &Tables, vendor_id: Id, menu_id: Id) -> Result<&MenuItem, DomainError> {
    match tx.menus.get(&menu_id) {
        Some(m) if m.vendor_id == vendor_id => Ok(m),
        _ => Err(DomainError::NotFound("Menu item not found".to_string())),
    }
}

// ---------------------------------------------------------------------------
// Menu management
// ---------------------------------------------------------------------------

/// The vendor's full menu, inactive items included.
pub fn vendor_menu(tx: &Tables, vendor_id: Id) -> Result<Vec<MenuItem>, DomainError> {
    tx.vendor(vendor_id)?;
    Ok(tx
        .menus
        .values()
        .filter(|m| m.vendor_id == vendor_id)
        .cloned()
        .collect())
}

pub fn add_menu_item(
    tx: &mut Tables,
    vendor_id: Id,
    item_name: &str,
    price: Cents,
    is_active: bool,
) -> Result<MenuItem, DomainError> {
    tx.vendor(vendor_id)?;
    if item_name.trim().is_empty() {
        return Err(DomainError::InvalidInput(
            "item_name must not be empty".to_string(),
        ));
    }
    let id = tx.insert_menu_item(vendor_id, item_name, price, is_active);
    info!(vendor_id, menu_id = id, item_name, "menu item added");
    tx.menu_item(id).cloned()
}

/// Edit a menu item's price and/or availability.  Absent fields are left
/// unchanged.  Existing cart snapshots and order lines are untouched; the
/// new price applies only to lines added after the edit.
pub fn update_menu_item(
    tx: &mut Tables,
    vendor_id: Id,
    menu_id: Id,
    price: Option<Cents>,
    is_active: Option<bool>,
) -> Result<MenuItem, DomainError> {
    tx.vendor(vendor_id)?;
    owned_menu_item(tx, vendor_id, menu_id)?;

    let menu = tx
        .menus
        .get_mut(&menu_id)
        .ok_or_else(|| DomainError::NotFound("Menu item not found".to_string()))?;
    if let Some(p) = price {
        menu.price = p;
    }
    if let Some(active) = is_active {
        menu.is_active = active;
    }
    info!(vendor_id, menu_id, "menu item updated");
    tx.menu_item(menu_id).cloned()
}

/// Remove a menu item and any open-cart lines holding it.
///
/// `Conflict` when order lines reference the item: history views join the
/// catalog for names, so an item with sales can only be deactivated.
pub fn delete_menu_item(
    tx: &mut Tables,
    vendor_id: Id,
    menu_id: Id,
) -> Result<(), DomainError> {
    tx.vendor(vendor_id)?;
    owned_menu_item(tx, vendor_id, menu_id)?;

    if tx.order_lines.values().any(|l| l.menu_id == menu_id) {
        return Err(DomainError::Conflict(
            "Menu item has order history; deactivate it instead".to_string(),
        ));
    }

    tx.cart_lines.retain(|_, l| l.menu_id != menu_id);
    tx.menus.remove(&menu_id);
    info!(vendor_id, menu_id, "menu item deleted");
    Ok(())
}

// ---------------------------------------------------------------------------
// Aggregates
// ---------------------------------------------------------------------------

/// Dashboard card: today's order count and revenue, pending count, and the
/// top five menu items by today's line count.
pub fn dashboard(
    tx: &Tables,
    vendor_id: Id,
    now: DateTime<Utc>,
) -> Result<VendorDashboard, DomainError> {
    tx.vendor(vendor_id)?;
    let involving = orders_involving(tx, vendor_id);

    let mut total_orders_today = 0;
    let mut total_revenue_today = Cents::ZERO;
    let mut pending_orders = 0;
    let mut item_counts: BTreeMap<String, i64> = BTreeMap::new();

    for order in &involving {
        if is_pending(order) {
            pending_orders += 1;
        }
        if !is_today(order, now) {
            continue;
        }
        total_orders_today += 1;
        total_revenue_today += order.total_gross;
        for line in tx.lines_of_order(order.id) {
            if line.vendor_id != vendor_id {
                continue;
            }
            if let Ok(menu) = tx.menu_item(line.menu_id) {
                *item_counts.entry(menu.item_name.clone()).or_insert(0) += 1;
            }
        }
    }

    // Top five by count; ties break alphabetically (BTreeMap iteration).
    let mut top_items: Vec<TopItem> = item_counts
        .into_iter()
        .map(|(name, orders)| TopItem { name, orders })
        .collect();
    top_items.sort_by(|a, b| b.orders.cmp(&a.orders).then(a.name.cmp(&b.name)));
    top_items.truncate(5);

    Ok(VendorDashboard {
        total_orders_today,
        total_revenue_today,
        pending_orders,
        top_items,
    })
}

/// Quick stats: today's totals plus the vendor's catalog size.
pub fn stats(tx: &Tables, vendor_id: Id, now: DateTime<Utc>) -> Result<VendorStats, DomainError> {
    tx.vendor(vendor_id)?;
    let involving = orders_involving(tx, vendor_id);

    let mut total_orders = 0;
    let mut completed_orders = 0;
    let mut revenue = Cents::ZERO;
    let mut pending_orders = 0;

    for order in &involving {
        if is_pending(order) {
            pending_orders += 1;
        }
        if !is_today(order, now) {
            continue;
        }
        total_orders += 1;
        revenue += order.total_gross;
        if order.status == OrderStatus::Completed {
            completed_orders += 1;
        }
    }

    let menu_items = tx
        .menus
        .values()
        .filter(|m| m.vendor_id == vendor_id)
        .count() as i64;

    Ok(VendorStats {
        total_orders,
        completed_orders,
        revenue,
        pending_orders,
        menu_items,
    })
}

/// The vendor's order queue, newest first, restricted to that vendor's own
/// lines.  `status_filter` narrows by current order status.
pub fn vendor_orders(
    tx: &Tables,
    vendor_id: Id,
    status_filter: Option<OrderStatus>,
    limit: usize,
) -> Result<Vec<VendorOrderDetail>, DomainError> {
    tx.vendor(vendor_id)?;

    let mut result = Vec::new();
    for order in orders_involving(tx, vendor_id) {
        if result.len() >= limit {
            break;
        }
        if let Some(want) = status_filter {
            if order.status != want {
                continue;
            }
        }
        let mut items = Vec::new();
        for line in tx.lines_of_order(order.id) {
            if line.vendor_id != vendor_id {
                continue;
            }
            let menu = tx.menu_item(line.menu_id)?;
            items.push(VendorOrderItem {
                name: menu.item_name.clone(),
                qty: line.qty,
                price: line.price,
            });
        }
        result.push(VendorOrderDetail {
            order_id: order.id,
            status: order.status,
            total_gross: order.total_gross,
            items,
            created_at: order.created_at,
            table_no: order.table_no.clone(),
        });
    }
    Ok(result)
}

/// Per-day revenue/order buckets for the trailing `days` window.  Days with
/// no orders are omitted (matching the original's GROUP BY semantics).
pub fn analytics(
    tx: &Tables,
    vendor_id: Id,
    days: i64,
    now: DateTime<Utc>,
) -> Result<VendorAnalytics, DomainError> {
    tx.vendor(vendor_id)?;
    let start = now - Duration::days(days);

    let mut buckets: BTreeMap<NaiveDate, (Cents, i64)> = BTreeMap::new();
    for order in orders_involving(tx, vendor_id) {
        if order.created_at < start {
            continue;
        }
        let entry = buckets
            .entry(order.created_at.date_naive())
            .or_insert((Cents::ZERO, 0));
        entry.0 += order.total_gross;
        entry.1 += 1;
    }

    Ok(VendorAnalytics {
        daily_data: buckets
            .into_iter()
            .map(|(date, (revenue, orders))| DailyBucket {
                date,
                revenue,
                orders,
            })
            .collect(),
        period_days: days,
    })
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use fc_cart::add_item;
    use fc_checkout::checkout;
    use fc_orders::{mark_paid, update_status};
    use fc_store::seed::seed_demo_catalog;

    fn seeded() -> Tables {
        let mut t = Tables::default();
        seed_demo_catalog(&mut t);
        t
    }

    fn vendor_id(t: &Tables, name: &str) -> Id {
        t.vendors
            .values()
            .find(|v| v.name == name)
            .map(|v| v.id)
            .unwrap()
    }

    fn menu_id(t: &Tables, name: &str) -> Id {
        t.menus
            .values()
            .find(|m| m.item_name == name)
            .map(|m| m.id)
            .unwrap()
    }

    #[test]
    fn unknown_vendor_is_not_found() {
        let t = seeded();
        assert!(dashboard(&t, 99, Utc::now()).is_err());
        assert!(stats(&t, 99, Utc::now()).is_err());
        assert!(vendor_orders(&t, 99, None, 10).is_err());
        assert!(analytics(&t, 99, 7, Utc::now()).is_err());
    }

    #[test]
    fn dashboard_counts_todays_orders_and_revenue() {
        let mut t = seeded();
        let pizza_item = menu_id(&t, "Margherita");
        let puri_item = menu_id(&t, "Pani Puri");
        add_item(&mut t, "g1", pizza_item, 2).unwrap();
        checkout(&mut t, "g1", None).unwrap(); // gross 417.90
        add_item(&mut t, "g2", puri_item, 1).unwrap();
        checkout(&mut t, "g2", None).unwrap(); // different vendor

        let pizza = vendor_id(&t, "Pizza Hub");
        let d = dashboard(&t, pizza, Utc::now()).unwrap();
        assert_eq!(d.total_orders_today, 1);
        assert_eq!(d.total_revenue_today, Cents::new(41_790));
        assert_eq!(d.pending_orders, 1);
        assert_eq!(d.top_items.len(), 1);
        assert_eq!(d.top_items[0].name, "Margherita");
    }

    #[test]
    fn yesterday_is_excluded_from_today_windows() {
        let mut t = seeded();
        let pizza_item = menu_id(&t, "Margherita");
        add_item(&mut t, "g", pizza_item, 1).unwrap();
        let order_id = checkout(&mut t, "g", None).unwrap().order_id;
        // Backdate the order a day.
        t.orders.get_mut(&order_id).unwrap().created_at = Utc::now() - Duration::days(1);

        let pizza = vendor_id(&t, "Pizza Hub");
        let d = dashboard(&t, pizza, Utc::now()).unwrap();
        assert_eq!(d.total_orders_today, 0);
        assert_eq!(d.total_revenue_today, Cents::ZERO);
        // The order is still pending even though it is old.
        assert_eq!(d.pending_orders, 1);
    }

    #[test]
    fn stats_tracks_completion() {
        let mut t = seeded();
        let pizza_item = menu_id(&t, "Margherita");
        add_item(&mut t, "g", pizza_item, 1).unwrap();
        let order_id = checkout(&mut t, "g", None).unwrap().order_id;
        let pizza = vendor_id(&t, "Pizza Hub");

        let s = stats(&t, pizza, Utc::now()).unwrap();
        assert_eq!((s.total_orders, s.completed_orders, s.pending_orders), (1, 0, 1));
        assert_eq!(s.menu_items, 2);

        mark_paid(&mut t, order_id).unwrap();
        update_status(&mut t, pizza, order_id, "preparing").unwrap();
        update_status(&mut t, pizza, order_id, "ready").unwrap();
        update_status(&mut t, pizza, order_id, "completed").unwrap();

        let s = stats(&t, pizza, Utc::now()).unwrap();
        assert_eq!((s.total_orders, s.completed_orders, s.pending_orders), (1, 1, 0));
    }

    #[test]
    fn vendor_orders_shows_only_own_lines() {
        let mut t = seeded();
        let pizza_item = menu_id(&t, "Margherita");
        let puri_item = menu_id(&t, "Pani Puri");
        add_item(&mut t, "g", pizza_item, 1).unwrap();
        add_item(&mut t, "g", puri_item, 2).unwrap();
        checkout(&mut t, "g", Some("T-12")).unwrap();

        let chaat = vendor_id(&t, "Chaat Corner");
        let orders = vendor_orders(&t, chaat, None, 10).unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].items.len(), 1, "only the vendor's own lines");
        assert_eq!(orders[0].items[0].name, "Pani Puri");
        assert_eq!(orders[0].table_no.as_deref(), Some("T-12"));
    }

    #[test]
    fn vendor_orders_status_filter_and_limit() {
        let mut t = seeded();
        let m = menu_id(&t, "Margherita");
        for token in ["a", "b", "c"] {
            add_item(&mut t, token, m, 1).unwrap();
            checkout(&mut t, token, None).unwrap();
        }
        let pizza = vendor_id(&t, "Pizza Hub");

        let all = vendor_orders(&t, pizza, None, 2).unwrap();
        assert_eq!(all.len(), 2, "limit applies");

        let none = vendor_orders(&t, pizza, None, 0).unwrap();
        assert!(none.is_empty(), "a zero limit yields no orders");

        let paid = vendor_orders(&t, pizza, Some(OrderStatus::Paid), 10).unwrap();
        assert!(paid.is_empty());
    }

    #[test]
    fn menu_listing_includes_inactive_items() {
        let mut t = seeded();
        let pizza = vendor_id(&t, "Pizza Hub");
        let m = menu_id(&t, "Margherita");
        update_menu_item(&mut t, pizza, m, None, Some(false)).unwrap();

        let menu = vendor_menu(&t, pizza).unwrap();
        assert_eq!(menu.len(), 2, "the vendor sees paused items too");
        assert!(menu.iter().any(|i| !i.is_active));
    }

    #[test]
    fn add_menu_item_rejects_blank_names_and_unknown_vendor() {
        let mut t = seeded();
        let pizza = vendor_id(&t, "Pizza Hub");

        let added = add_menu_item(&mut t, pizza, "Calzone", Cents::new(22_900), true).unwrap();
        assert_eq!(added.vendor_id, pizza);
        assert_eq!(t.menus[&added.id].price, Cents::new(22_900));

        assert!(matches!(
            add_menu_item(&mut t, pizza, "   ", Cents::new(100), true),
            Err(DomainError::InvalidInput(_))
        ));
        assert!(matches!(
            add_menu_item(&mut t, 99, "Ghost", Cents::new(100), true),
            Err(DomainError::NotFound(_))
        ));
    }

    #[test]
    fn price_edit_spares_existing_cart_snapshots() {
        let mut t = seeded();
        let pizza = vendor_id(&t, "Pizza Hub");
        let m = menu_id(&t, "Margherita"); // 199.00
        add_item(&mut t, "early", m, 1).unwrap();

        update_menu_item(&mut t, pizza, m, Some(Cents::new(24_900)), None).unwrap();

        // The earlier cart keeps its snapshot; a new cart sees the new price.
        let early = fc_cart::get_cart(&mut t, "early").unwrap();
        assert_eq!(early.items[0].price_each, Cents::new(19_900));
        let late = add_item(&mut t, "late", m, 1).unwrap();
        assert_eq!(late.items[0].price_each, Cents::new(24_900));
    }

    #[test]
    fn deactivated_item_blocks_new_adds() {
        let mut t = seeded();
        let pizza = vendor_id(&t, "Pizza Hub");
        let m = menu_id(&t, "Margherita");
        update_menu_item(&mut t, pizza, m, None, Some(false)).unwrap();

        assert!(matches!(
            add_item(&mut t, "g", m, 1),
            Err(DomainError::NotFound(_))
        ));
    }

    #[test]
    fn edits_are_scoped_to_the_owning_vendor() {
        let mut t = seeded();
        let chaat = vendor_id(&t, "Chaat Corner");
        let m = menu_id(&t, "Margherita"); // Pizza Hub's item

        assert!(matches!(
            update_menu_item(&mut t, chaat, m, Some(Cents::new(1)), None),
            Err(DomainError::NotFound(_))
        ));
        assert!(matches!(
            delete_menu_item(&mut t, chaat, m),
            Err(DomainError::NotFound(_))
        ));
    }

    #[test]
    fn delete_drops_cart_lines_but_not_sold_items() {
        let mut t = seeded();
        let pizza = vendor_id(&t, "Pizza Hub");
        let m = menu_id(&t, "Farmhouse");
        add_item(&mut t, "browser", m, 2).unwrap();

        delete_menu_item(&mut t, pizza, m).unwrap();
        assert!(!t.menus.contains_key(&m));
        let cart = fc_cart::get_cart(&mut t, "browser").unwrap();
        assert!(cart.items.is_empty(), "open-cart lines go with the item");

        // An item with order history can only be deactivated.
        let sold = menu_id(&t, "Margherita");
        add_item(&mut t, "g", sold, 1).unwrap();
        checkout(&mut t, "g", None).unwrap();
        assert!(matches!(
            delete_menu_item(&mut t, pizza, sold),
            Err(DomainError::Conflict(_))
        ));
        assert!(t.menus.contains_key(&sold));
    }

    #[test]
    fn analytics_buckets_by_day() {
        let mut t = seeded();
        let m = menu_id(&t, "Margherita");
        add_item(&mut t, "a", m, 1).unwrap();
        let today = checkout(&mut t, "a", None).unwrap().order_id;
        add_item(&mut t, "b", m, 1).unwrap();
        let old = checkout(&mut t, "b", None).unwrap().order_id;
        t.orders.get_mut(&old).unwrap().created_at = Utc::now() - Duration::days(3);

        let pizza = vendor_id(&t, "Pizza Hub");
        let a = analytics(&t, pizza, 7, Utc::now()).unwrap();
        assert_eq!(a.period_days, 7);
        assert_eq!(a.daily_data.len(), 2);
        let total_orders: i64 = a.daily_data.iter().map(|b| b.orders).sum();
        assert_eq!(total_orders, 2);

        // Outside the window.
        let narrow = analytics(&t, pizza, 1, Utc::now()).unwrap();
        assert_eq!(narrow.daily_data.len(), 1);
        assert_eq!(
            narrow.daily_data[0].date,
            t.orders[&today].created_at.date_naive()
        );
    }
}
