//! Postgres write-through mirror.
//!
//! The in-memory store (`fc-store`) is authoritative for this single-process
//! MVP; this crate mirrors committed orders (and the catalog they reference)
//! into Postgres for provenance and reporting.  Mirroring is one-way and
//! idempotent — re-mirroring an order upserts the same rows.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

use fc_schemas::{MenuItem, Order, OrderLine, Vendor};

pub const ENV_DB_URL: &str = "FC_DATABASE_URL";

/// Connect to Postgres using FC_DATABASE_URL.
pub async fn connect_from_env() -> Result<PgPool> {
    let url =
        std::env::var(ENV_DB_URL).with_context(|| format!("missing env var {ENV_DB_URL}"))?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&url)
        .await
        .context("failed to connect to Postgres")?;

    Ok(pool)
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

/// Mirror the catalog rows an order references.  Upsert keeps later price
/// edits visible without touching mirrored order lines.
pub async fn mirror_catalog(pool: &PgPool, vendors: &[Vendor], menus: &[MenuItem]) -> Result<()> {
    for v in vendors {
        sqlx::query(
            r#"
            insert into vendors (vendor_id, name, stall_no, gstin)
            values ($1, $2, $3, $4)
            on conflict (vendor_id) do update
                set name = excluded.name,
                    stall_no = excluded.stall_no,
                    gstin = excluded.gstin
            "#,
        )
        .bind(v.id)
        .bind(&v.name)
        .bind(&v.stall_no)
        .bind(&v.gstin)
        .execute(pool)
        .await
        .context("mirror_catalog vendor upsert failed")?;
    }

    for m in menus {
        sqlx::query(
            r#"
            insert into menus (menu_id, vendor_id, item_name, price_cents, is_active)
            values ($1, $2, $3, $4, $5)
            on conflict (menu_id) do update
                set item_name = excluded.item_name,
                    price_cents = excluded.price_cents,
                    is_active = excluded.is_active
            "#,
        )
        .bind(m.id)
        .bind(m.vendor_id)
        .bind(&m.item_name)
        .bind(m.price.raw())
        .bind(m.is_active)
        .execute(pool)
        .await
        .context("mirror_catalog menu upsert failed")?;
    }

    Ok(())
}

/// Mirror one order and its lines.  Status and line timestamps follow later
/// lifecycle updates through the same upsert.
pub async fn mirror_order(pool: &PgPool, order: &Order, lines: &[OrderLine]) -> Result<()> {
    sqlx::query(
        r#"
        insert into orders (
          order_id, cart_id, status, total_gross_cents, total_tax_cents,
          total_net_cents, payment_id, table_no, created_at_utc
        ) values ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        on conflict (order_id) do update
            set status = excluded.status,
                payment_id = excluded.payment_id
        "#,
    )
    .bind(order.id)
    .bind(order.cart_id)
    .bind(order.status.as_str())
    .bind(order.total_gross.raw())
    .bind(order.total_tax.raw())
    .bind(order.total_net.raw())
    .bind(&order.payment_id)
    .bind(&order.table_no)
    .bind(order.created_at)
    .execute(pool)
    .await
    .context("mirror_order upsert failed")?;

    for line in lines {
        sqlx::query(
            r#"
            insert into order_lines (
              order_line_id, order_id, vendor_id, menu_id, qty,
              price_cents, tax_cents, prepared_at_utc, ready_at_utc
            ) values ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            on conflict (order_line_id) do update
                set prepared_at_utc = excluded.prepared_at_utc,
                    ready_at_utc = excluded.ready_at_utc
            "#,
        )
        .bind(line.id)
        .bind(line.order_id)
        .bind(line.vendor_id)
        .bind(line.menu_id)
        .bind(line.qty)
        .bind(line.price.raw())
        .bind(line.tax.raw())
        .bind(line.prepared_at)
        .bind(line.ready_at)
        .execute(pool)
        .await
        .context("mirror_order line upsert failed")?;
    }

    Ok(())
}

#[derive(Debug, Clone)]
pub struct MirroredOrderStatus {
    pub order_id: i64,
    pub status: String,
    pub total_gross_cents: i64,
    pub created_at_utc: DateTime<Utc>,
}

/// Fetch the mirrored status row for one order.
pub async fn fetch_order_status(pool: &PgPool, order_id: i64) -> Result<MirroredOrderStatus> {
    let row = sqlx::query(
        r#"
        select order_id, status, total_gross_cents, created_at_utc
        from orders
        where order_id = $1
        "#,
    )
    .bind(order_id)
    .fetch_one(pool)
    .await
    .context("fetch_order_status failed")?;

    Ok(MirroredOrderStatus {
        order_id: row.try_get("order_id")?,
        status: row.try_get("status")?,
        total_gross_cents: row.try_get("total_gross_cents")?,
        created_at_utc: row.try_get("created_at_utc")?,
    })
}

/// Count mirrored orders (connectivity / smoke checks).
pub async fn count_orders(pool: &PgPool) -> Result<i64> {
    let (n,): (i64,) = sqlx::query_as::<_, (i64,)>("select count(*)::bigint from orders")
        .fetch_one(pool)
        .await
        .context("count_orders failed")?;
    Ok(n)
}
