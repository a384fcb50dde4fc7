//! RustPress Accounts server

use axum::{
    http::{header, HeaderValue, Method},
    Router,
};
use rustpress_accounts::{
    create_routes, AccountError, AccountService, AccountsConfig, DiskMediaUploader,
    PgCredentialStore,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {:?}", e);
    }
    tracing::info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<(), AccountError> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let config = AccountsConfig::from_env()?;
    config.validate()?;

    let database_url = config
        .database_url
        .clone()
        .ok_or_else(|| AccountError::Config("DATABASE_URL environment variable must be set".into()))?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await?;
    tracing::info!("Connected to database");

    let store = PgCredentialStore::new(pool);
    store.migrate().await?;

    let uploader = DiskMediaUploader::new(&config.media_root, &config.media_base_url);
    let accounts = Arc::new(AccountService::new(&config, Arc::new(store), Arc::new(uploader)));

    let mut app: Router = create_routes(accounts);

    // Serve uploaded media locally unless it lives behind an external URL
    if config.media_base_url.starts_with('/') {
        app = app.nest_service(&config.media_base_url, ServeDir::new(&config.media_root));
    }

    if let Some(origin) = &config.cors_origin {
        let origin = origin
            .parse::<HeaderValue>()
            .map_err(|e| AccountError::Config(format!("CORS_ORIGIN is invalid: {e}")))?;
        app = app.layer(
            CorsLayer::new()
                .allow_origin(origin)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
                .allow_credentials(true),
        );
    }

    let app = app.layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .map_err(|e| AccountError::Config(format!("Cannot bind {}: {e}", config.bind_addr)))?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AccountError::Internal(format!("Server error: {e}")))?;

    Ok(())
}
