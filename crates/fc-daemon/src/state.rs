//! Shared runtime state for fc-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum.  The authoritative
//! store lives here; the broadcast bus feeds the SSE order-event stream; the
//! optional Postgres pool drives the write-through order mirror.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tokio::sync::broadcast;
use tracing::warn;

use fc_schemas::{Id, OrderStatus};
use fc_store::Store;

// ---------------------------------------------------------------------------
// BusMsg — SSE event bus payload
// ---------------------------------------------------------------------------

/// Messages broadcast over the internal event bus and surfaced as SSE events.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusMsg {
    Heartbeat { ts_millis: i64 },
    OrderCreated { order_id: Id },
    StatusChanged { order_id: Id, status: OrderStatus },
}

// ---------------------------------------------------------------------------
// BuildInfo
// ---------------------------------------------------------------------------

/// Static build metadata included in the health response.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// Shared handle across all Axum handlers (cloned via `Arc`).
pub struct AppState {
    /// Authoritative tables.
    pub store: Store,
    /// Broadcast bus for SSE order events.
    pub bus: broadcast::Sender<BusMsg>,
    /// Static build metadata.
    pub build: BuildInfo,
    /// Optional Postgres write-through mirror (None without FC_DATABASE_URL).
    pub db: Option<PgPool>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        let (bus, _rx) = broadcast::channel::<BusMsg>(1024);
        Self {
            store: Store::new(),
            bus,
            build: BuildInfo {
                service: "fc-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            db: None,
        }
    }

    pub fn with_db(mut self, pool: PgPool) -> Self {
        self.db = Some(pool);
        self
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Mirror an order's current rows into Postgres, if a pool is configured.
///
/// Fire-and-forget: mirror failures are logged, never surfaced to the
/// request — the in-memory store stays authoritative.
pub fn mirror_order(st: &Arc<AppState>, order_id: Id) {
    let Some(pool) = st.db.clone() else {
        return;
    };
    let (order, lines) = st.store.read(|tx| {
        (
            tx.orders.get(&order_id).cloned(),
            tx.lines_of_order(order_id)
                .into_iter()
                .cloned()
                .collect::<Vec<_>>(),
        )
    });
    let Some(order) = order else {
        return;
    };
    tokio::spawn(async move {
        if let Err(err) = fc_db::mirror_order(&pool, &order, &lines).await {
            warn!(order_id = order.id, error = %err, "order mirror failed");
        }
    });
}

/// Spawn a background task that emits a heartbeat SSE every `interval`.
pub fn spawn_heartbeat(bus: broadcast::Sender<BusMsg>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let ts = chrono::Utc::now().timestamp_millis();
            let _ = bus.send(BusMsg::Heartbeat { ts_millis: ts });
        }
    });
}
