//! Curbside USSD - restaurant menu and table booking over USSD
//!
//! A Rust backend implementing a per-session menu state machine behind an
//! Africa's Talking style USSD gateway callback.

mod api;
mod catalog;
mod config;
mod db;
mod runtime;
mod sms;
mod state_machine;

use api::{create_router, AppState};
use config::AppConfig;
use db::Database;
use runtime::{spawn_session_sweeper, DatabaseStorage, ProductionRuntime};
use std::net::SocketAddr;
use std::path::PathBuf;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "curbside_ussd=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = AppConfig::from_env();

    // Ensure database directory exists
    if let Some(parent) = PathBuf::from(&config.db_path).parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(path = %config.db_path, "Opening database");
    let db = Database::open(&config.db_path)?;

    db.seed_catalog_if_empty()?;

    spawn_session_sweeper(DatabaseStorage::new(db.clone()), config.session_ttl);

    let sms = sms::from_config(&config.sms)?;
    tracing::info!(provider = sms.provider(), "SMS notifications configured");

    let runtime = ProductionRuntime::new(DatabaseStorage::new(db), sms, config.branding)
        .with_utc_offset(config.utc_offset);
    let app = create_router(AppState::new(runtime)).layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Curbside USSD server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
