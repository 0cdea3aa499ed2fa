//! Demo catalog seed.
//!
//! Installs the sample vendors and menu items used by the dev UI and the
//! scenario tests.  Idempotent: a non-empty catalog is left untouched.

use fc_money::Cents;
use tracing::info;

use crate::Tables;

pub fn seed_demo_catalog(tx: &mut Tables) {
    if !tx.vendors.is_empty() {
        return;
    }

    let v1 = tx.insert_vendor("Pizza Hub", "A1", "29ABCDE1234F1Z5");
    let v2 = tx.insert_vendor("Biryani Bay", "B4", "29ABCDE1234F1Z6");
    let v3 = tx.insert_vendor("Chaat Corner", "C2", "29ABCDE1234F1Z7");

    tx.insert_menu_item(v1, "Margherita", Cents::new(19_900), true);
    tx.insert_menu_item(v1, "Farmhouse", Cents::new(27_900), true);
    tx.insert_menu_item(v2, "Chicken Biryani", Cents::new(24_900), true);
    tx.insert_menu_item(v2, "Veg Biryani", Cents::new(19_900), true);
    tx.insert_menu_item(v3, "Pani Puri", Cents::new(5_900), true);
    tx.insert_menu_item(v3, "Dahi Puri", Cents::new(7_900), true);

    info!(
        vendors = tx.vendors.len(),
        menu_items = tx.menus.len(),
        "seeded demo catalog"
    );
}
