//! fc-daemon entry point.
//!
//! This file is intentionally thin: it sets up tracing, builds the shared
//! state, seeds the demo catalog, wires middleware, and starts the HTTP
//! server.  All route handlers live in `routes.rs`; all shared state types
//! live in `state.rs`.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use fc_daemon::{routes, state};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env.local if present (dev convenience).  Silent if the file does
    // not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let mut shared = state::AppState::new();

    // Optional Postgres mirror: enabled only when FC_DATABASE_URL is set.
    // The in-memory store stays authoritative either way.
    if std::env::var(fc_db::ENV_DB_URL).is_ok() {
        match fc_db::connect_from_env().await {
            Ok(pool) => {
                fc_db::migrate(&pool).await.context("mirror migrations")?;
                shared = shared.with_db(pool);
                info!("order mirror enabled");
            }
            Err(err) => warn!(error = %err, "order mirror unavailable, continuing without it"),
        }
    } else {
        info!("order mirror disabled (no {})", fc_db::ENV_DB_URL);
    }

    shared
        .store
        .write(|tx| {
            fc_store::seed::seed_demo_catalog(tx);
            Ok(())
        })
        .ok();
    if let Some(pool) = shared.db.clone() {
        let snapshot = shared.store.read(|tx| {
            (
                tx.vendors.values().cloned().collect::<Vec<_>>(),
                tx.menus.values().cloned().collect::<Vec<_>>(),
            )
        });
        if let Err(err) = fc_db::mirror_catalog(&pool, &snapshot.0, &snapshot.1).await {
            warn!(error = %err, "catalog mirror failed");
        }
    }

    let shared = Arc::new(shared);

    state::spawn_heartbeat(shared.bus.clone(), Duration::from_secs(15));

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    let addr = bind_addr_from_env().unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8880)));
    info!("fc-daemon listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .await
        .context("server crashed")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

fn bind_addr_from_env() -> Option<SocketAddr> {
    std::env::var("FC_DAEMON_ADDR").ok()?.parse().ok()
}

/// CORS: allow only localhost origins (kiosk tablets and the vendor portal
/// run on the same host in development).
fn cors_localhost_only() -> CorsLayer {
    let allowed_origins = [
        "http://localhost",
        "http://127.0.0.1",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
        "http://localhost:5173",
        "http://127.0.0.1:5173",
    ];

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers(tower_http::cors::Any)
}
