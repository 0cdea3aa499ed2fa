//! Cart Manager.
//!
//! Owns per-token carts and their lines.  The two invariants that matter:
//!
//! 1. **Merge on duplicate add.** A (cart, menu item) pair is unique; adding
//!    the same item again increments the existing line's quantity.
//! 2. **Price snapshots stick.** `price_snapshot` is captured at first add
//!    and never refreshed — the first-seen price covers the line's whole
//!    cumulative quantity, even across later menu price changes.
//!
//! All operations take an explicit transaction handle from `fc-store`;
//! callers wrap them in `Store::write` / `Store::read`.

use chrono::Utc;
use tracing::info;

use fc_money::Cents;
use fc_schemas::{CartLine, CartLineView, CartView, DomainError, Id};
use fc_store::Tables;

/// Return the token's Open cart id, creating an empty cart on first access.
pub fn get_or_create_cart(tx: &mut Tables, token: &str) -> Id {
    if let Some(cart) = tx.open_cart_for_token(token) {
        return cart.id;
    }
    let id = tx.insert_cart(token, Utc::now());
    info!(cart_id = id, "created cart");
    id
}

/// Add `qty` of a menu item to the token's cart.
///
/// Fails `InvalidInput` for qty < 1 and `NotFound` when the menu item is
/// absent or inactive.  Merges into an existing line for the same item.
pub fn add_item(tx: &mut Tables, token: &str, menu_id: Id, qty: i64) -> Result<CartView, DomainError> {
    if qty < 1 {
        return Err(DomainError::InvalidInput(format!(
            "qty must be >= 1, got {qty}"
        )));
    }
    let menu = tx.active_menu_item(menu_id)?.clone();
    let cart_id = get_or_create_cart(tx, token);

    let existing = tx
        .cart_lines
        .values_mut()
        .find(|l| l.cart_id == cart_id && l.menu_id == menu_id);
    match existing {
        Some(line) => {
            // Merge; the first-seen snapshot keeps covering the whole qty.
            line.qty = line
                .qty
                .checked_add(qty)
                .ok_or_else(|| DomainError::InvalidInput("qty overflow".to_string()))?;
        }
        None => {
            tx.insert_cart_line(CartLine {
                id: 0, // store-allocated
                cart_id,
                vendor_id: menu.vendor_id,
                menu_id,
                qty,
                price_snapshot: menu.price,
            });
        }
    }

    info!(cart_id, menu_id, qty, "cart add");
    cart_view(tx, cart_id, token)
}

/// Remove one whole line from the token's cart (no quantity decrement).
///
/// `NotFound` when the token has no Open cart or the line id does not belong
/// to that cart.
pub fn remove_item(tx: &mut Tables, token: &str, cart_line_id: Id) -> Result<CartView, DomainError> {
    let cart_id = tx
        .open_cart_for_token(token)
        .map(|c| c.id)
        .ok_or_else(|| DomainError::NotFound("Cart not found".to_string()))?;

    let owned = tx
        .cart_lines
        .get(&cart_line_id)
        .is_some_and(|l| l.cart_id == cart_id);
    if !owned {
        return Err(DomainError::NotFound("Cart item not found".to_string()));
    }
    tx.cart_lines.remove(&cart_line_id);

    info!(cart_id, cart_line_id, "cart remove");
    cart_view(tx, cart_id, token)
}

/// The token's cart view, creating an empty cart lazily.
pub fn get_cart(tx: &mut Tables, token: &str) -> Result<CartView, DomainError> {
    let cart_id = get_or_create_cart(tx, token);
    cart_view(tx, cart_id, token)
}

/// Build the display view for a cart: lines joined with the current catalog
/// names.  Only prices come from the snapshot; names are live.
pub fn cart_view(tx: &Tables, cart_id: Id, token: &str) -> Result<CartView, DomainError> {
    let mut items = Vec::new();
    let mut subtotal = Cents::ZERO;

    for line in tx.lines_of_cart(cart_id) {
        let menu = tx.menu_item(line.menu_id)?;
        let line_total = line
            .price_snapshot
            .checked_mul_qty(line.qty)
            .ok_or_else(|| DomainError::InvalidInput("amount overflow".to_string()))?;
        subtotal += line_total;
        items.push(CartLineView {
            id: line.id,
            vendor_id: line.vendor_id,
            menu_id: line.menu_id,
            item_name: menu.item_name.clone(),
            qty: line.qty,
            price_each: line.price_snapshot,
            line_total,
        });
    }

    Ok(CartView {
        cart_id,
        user_token: token.to_string(),
        items,
        subtotal,
    })
}

/// Re-key every cart owned by `old_token` to `new_token`.
///
/// No-op when `old_token` is empty, absent, or equal to `new_token`.
/// Returns the number of carts migrated.  Lines travel with their cart, so
/// nothing is lost or duplicated.
pub fn migrate_cart(tx: &mut Tables, old_token: &str, new_token: &str) -> usize {
    if old_token.is_empty() || old_token == new_token {
        return 0;
    }
    let mut migrated = 0;
    for cart in tx.carts.values_mut() {
        if cart.user_token == old_token {
            cart.user_token = new_token.to_string();
            migrated += 1;
        }
    }
    if migrated > 0 {
        info!(migrated, "migrated guest carts to user token");
    }
    migrated
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
