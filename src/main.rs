//! License Key Service - Main Application Entry Point
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Connect the configured key store (running migrations for PostgreSQL)
//! 3. Build HTTP router with routes and middleware
//! 4. Start server on configured port

use std::sync::Arc;

use license_key_server::{
    AppState, build_router,
    config::{Config, StoreBackend},
    db,
    store::{MemoryKeyStore, PgKeyStore, RestKeyStore, SharedKeyStore},
};
use tracing_subscriber::EnvFilter;

/// Connect the key store selected by `KEY_STORE`.
async fn connect_store(config: &Config) -> anyhow::Result<SharedKeyStore> {
    let store: SharedKeyStore = match config.key_store {
        StoreBackend::Postgres => {
            let database_url = config.database_url.as_deref().unwrap_or_default();
            let pool = db::create_pool(
                database_url,
                config.database_max_connections,
                config.store_timeout(),
            )
            .await?;
            tracing::info!("Database pool created");

            db::run_migrations(&pool).await?;
            tracing::info!("Database migrations complete");

            Arc::new(PgKeyStore::new(pool))
        }
        StoreBackend::Rest => {
            let url = config.supabase_url.as_deref().unwrap_or_default();
            let service_key = config.supabase_service_key.as_deref().unwrap_or_default();
            tracing::info!("Using REST key store at {}", url);

            Arc::new(RestKeyStore::new(url, service_key, config.store_timeout())?)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory key store; keys are lost on restart");
            Arc::new(MemoryKeyStore::new())
        }
    };

    Ok(store)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!(backend = ?config.key_store, "Configuration loaded");

    if config.uses_default_password() {
        tracing::warn!("DASHBOARD_PASSWORD is not set; the built-in default is in use");
    }

    let store = connect_store(&config).await?;
    let app = build_router(AppState::new(store, config.dashboard_password.as_str()));

    // Bind to network address and start server
    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
