//! Authoritative in-memory store with an explicit transaction boundary.
//!
//! # Design
//!
//! All tables live behind a single mutex inside [`Store`].  Readers receive
//! `&Tables`; writers receive `&mut Tables` through [`Store::write`], which
//! applies the closure to a **clone** of the tables and installs the clone
//! only when the closure returns `Ok`.  Rollback on every error path is
//! therefore structural — a failed operation cannot leave partial mutations
//! behind.
//!
//! The single-writer lock doubles as the serialization boundary required by
//! the checkout/cart invariants: concurrent adds to the same cart line
//! cannot lose increments, and checkout is single-flight per cart.

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use fc_schemas::{
    Cart, CartLine, CartState, DomainError, Id, MenuItem, Order, OrderLine, User, Vendor,
};

pub mod seed;

// ---------------------------------------------------------------------------
// Id allocation
// ---------------------------------------------------------------------------

/// Per-table sequential id counters (first id = 1, matching the original
/// integer primary keys and the `STUB-{order_id}` payment-id format).
#[derive(Debug, Clone, Default)]
struct IdGen {
    vendor: Id,
    menu: Id,
    cart: Id,
    cart_line: Id,
    order: Id,
    order_line: Id,
    user: Id,
}

fn bump(counter: &mut Id) -> Id {
    *counter += 1;
    *counter
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

/// All rows, keyed by id.  `BTreeMap` keeps iteration in id order, which is
/// also insertion order under sequential allocation.
#[derive(Debug, Clone, Default)]
pub struct Tables {
    ids: IdGen,
    pub vendors: BTreeMap<Id, Vendor>,
    pub menus: BTreeMap<Id, MenuItem>,
    pub carts: BTreeMap<Id, Cart>,
    pub cart_lines: BTreeMap<Id, CartLine>,
    pub orders: BTreeMap<Id, Order>,
    pub order_lines: BTreeMap<Id, OrderLine>,
    pub users: BTreeMap<Id, User>,
}

impl Tables {
    // --- inserts (store-allocated ids) ---

    pub fn insert_vendor(&mut self, name: &str, stall_no: &str, gstin: &str) -> Id {
        let id = bump(&mut self.ids.vendor);
        self.vendors.insert(
            id,
            Vendor {
                id,
                name: name.to_string(),
                stall_no: stall_no.to_string(),
                gstin: gstin.to_string(),
            },
        );
        id
    }

    pub fn insert_menu_item(
        &mut self,
        vendor_id: Id,
        item_name: &str,
        price: fc_money::Cents,
        is_active: bool,
    ) -> Id {
        let id = bump(&mut self.ids.menu);
        self.menus.insert(
            id,
            MenuItem {
                id,
                vendor_id,
                item_name: item_name.to_string(),
                price,
                is_active,
            },
        );
        id
    }

    pub fn insert_cart(&mut self, user_token: &str, created_at: DateTime<Utc>) -> Id {
        let id = bump(&mut self.ids.cart);
        self.carts.insert(
            id,
            Cart {
                id,
                user_token: user_token.to_string(),
                state: CartState::Open,
                created_at,
            },
        );
        id
    }

    pub fn insert_cart_line(&mut self, mut line: CartLine) -> Id {
        let id = bump(&mut self.ids.cart_line);
        line.id = id;
        self.cart_lines.insert(id, line);
        id
    }

    pub fn insert_order(&mut self, mut order: Order) -> Id {
        let id = bump(&mut self.ids.order);
        order.id = id;
        self.orders.insert(id, order);
        id
    }

    pub fn insert_order_line(&mut self, mut line: OrderLine) -> Id {
        let id = bump(&mut self.ids.order_line);
        line.id = id;
        self.order_lines.insert(id, line);
        id
    }

    pub fn insert_user(&mut self, mut user: User) -> Id {
        let id = bump(&mut self.ids.user);
        user.id = id;
        self.users.insert(id, user);
        id
    }

    // --- lookups ---

    pub fn vendor(&self, id: Id) -> Result<&Vendor, DomainError> {
        self.vendors
            .get(&id)
            .ok_or_else(|| DomainError::NotFound("Vendor not found".to_string()))
    }

    pub fn menu_item(&self, id: Id) -> Result<&MenuItem, DomainError> {
        self.menus
            .get(&id)
            .ok_or_else(|| DomainError::NotFound("Menu item not found".to_string()))
    }

    /// Active menu item only — inactive items are invisible to carts.
    pub fn active_menu_item(&self, id: Id) -> Result<&MenuItem, DomainError> {
        match self.menus.get(&id) {
            Some(m) if m.is_active => Ok(m),
            _ => Err(DomainError::NotFound("Menu item not found".to_string())),
        }
    }

    pub fn order(&self, id: Id) -> Result<&Order, DomainError> {
        self.orders
            .get(&id)
            .ok_or_else(|| DomainError::NotFound("Order not found".to_string()))
    }

    pub fn order_mut(&mut self, id: Id) -> Result<&mut Order, DomainError> {
        self.orders
            .get_mut(&id)
            .ok_or_else(|| DomainError::NotFound("Order not found".to_string()))
    }

    /// The token's current Open cart, if any.  Newest wins — after a
    /// checkout (or a migration that brought a fresher cart along) older
    /// carts remain only as order provenance.
    pub fn open_cart_for_token(&self, token: &str) -> Option<&Cart> {
        self.carts
            .values()
            .rev()
            .find(|c| c.user_token == token && c.state == CartState::Open)
    }

    /// The token's most recent cart regardless of state.
    pub fn latest_cart_for_token(&self, token: &str) -> Option<&Cart> {
        self.carts.values().rev().find(|c| c.user_token == token)
    }

    pub fn lines_of_cart(&self, cart_id: Id) -> Vec<&CartLine> {
        self.cart_lines
            .values()
            .filter(|l| l.cart_id == cart_id)
            .collect()
    }

    pub fn lines_of_order(&self, order_id: Id) -> Vec<&OrderLine> {
        self.order_lines
            .values()
            .filter(|l| l.order_id == order_id)
            .collect()
    }

    pub fn user_by_email(&self, email: &str) -> Option<&User> {
        self.users.values().find(|u| u.email == email)
    }

    /// Cascade-delete a cart's lines (cart ownership is exclusive).
    pub fn delete_cart_lines(&mut self, cart_id: Id) {
        self.cart_lines.retain(|_, l| l.cart_id != cart_id);
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Shared handle over the tables.  Cheap to share behind an `Arc`.
#[derive(Debug, Default)]
pub struct Store {
    inner: Mutex<Tables>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a read-only closure against the current tables.
    pub fn read<R>(&self, f: impl FnOnce(&Tables) -> R) -> R {
        let guard = self.lock();
        f(&guard)
    }

    /// Run a mutating closure transactionally.
    ///
    /// The closure operates on a clone of the tables; the clone replaces the
    /// live tables only when the closure returns `Ok`.  On `Err` the clone
    /// is dropped and the store is untouched.
    pub fn write<R>(
        &self,
        f: impl FnOnce(&mut Tables) -> Result<R, DomainError>,
    ) -> Result<R, DomainError> {
        let mut guard = self.lock();
        let mut work = guard.clone();
        let out = f(&mut work)?;
        *guard = work;
        Ok(out)
    }

    // A poisoned lock can only arise from a panic in a reader closure; the
    // live tables are never mid-mutation (writers mutate a clone), so the
    // inner value is always consistent and safe to recover.
    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use fc_money::Cents;

    #[test]
    fn ids_are_sequential_from_one() {
        let mut t = Tables::default();
        let v1 = t.insert_vendor("A", "A1", "G1");
        let v2 = t.insert_vendor("B", "B1", "G2");
        assert_eq!((v1, v2), (1, 2));
        let m1 = t.insert_menu_item(v1, "Item", Cents::new(100), true);
        assert_eq!(m1, 1, "each table has its own counter");
    }

    #[test]
    fn write_commits_on_ok() {
        let store = Store::new();
        store
            .write(|tx| {
                tx.insert_vendor("A", "A1", "G1");
                Ok(())
            })
            .unwrap();
        assert_eq!(store.read(|tx| tx.vendors.len()), 1);
    }

    #[test]
    fn write_rolls_back_on_err() {
        let store = Store::new();
        let res: Result<(), DomainError> = store.write(|tx| {
            tx.insert_vendor("A", "A1", "G1");
            Err(DomainError::InvalidState("boom".to_string()))
        });
        assert!(res.is_err());
        assert_eq!(
            store.read(|tx| tx.vendors.len()),
            0,
            "failed transaction must leave no trace"
        );
    }

    #[test]
    fn rolled_back_ids_are_not_burned() {
        let store = Store::new();
        let _ = store.write(|tx| -> Result<(), DomainError> {
            tx.insert_vendor("A", "A1", "G1");
            Err(DomainError::InvalidState("boom".to_string()))
        });
        let id = store
            .write(|tx| Ok(tx.insert_vendor("B", "B1", "G2")))
            .unwrap();
        assert_eq!(id, 1, "counters roll back with the tables");
    }

    #[test]
    fn inactive_menu_item_is_invisible() {
        let mut t = Tables::default();
        let v = t.insert_vendor("A", "A1", "G1");
        let m = t.insert_menu_item(v, "Gone", Cents::new(100), false);
        assert!(t.active_menu_item(m).is_err());
        assert!(t.menu_item(m).is_ok());
    }

    #[test]
    fn open_cart_lookup_prefers_newest() {
        let mut t = Tables::default();
        let now = Utc::now();
        let c1 = t.insert_cart("tok", now);
        let c2 = t.insert_cart("tok", now);
        assert_eq!(t.open_cart_for_token("tok").unwrap().id, c2);
        t.carts.get_mut(&c2).unwrap().state = CartState::CheckedOut { order_id: 1 };
        assert_eq!(t.open_cart_for_token("tok").unwrap().id, c1);
    }
}
