//! Chirpy API Server
//!
//! REST API server for Chirpy.

use anyhow::Context;
use chirpy_api::{create_router, AppState};
use chirpy_core::{AppConfig, LoggingConfig, PgStore, Store};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    // Load configuration; environment variables override an optional TOML file
    let config = match std::env::var("CONFIG_FILE") {
        Ok(path) => AppConfig::from_file(path)
            .and_then(AppConfig::with_env_override)
            .context("Failed to load configuration")?,
        Err(_) => AppConfig::from_env().context("Failed to load configuration")?,
    };

    init_tracing(&config.logging);

    config.validate().context("Invalid configuration")?;
    tracing::debug!(server = ?config.server, auth = ?config.auth, "Loaded configuration");

    // Connect to storage
    let pg = PgStore::new(&config.database)
        .await
        .context("Failed to connect to database")?;
    pg.init_schema()
        .await
        .context("Failed to initialize database schema")?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let platform = config.server.platform.clone();

    // Create application state
    let state = Arc::new(AppState::new(config, Store::from_backend(pg)));

    // Create router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%platform, "Chirpy API Server starting on http://{}", addr);
    tracing::info!("OpenAPI spec at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "chirpy_api={level},chirpy_core={level},audit=info,tower_http=debug",
            level = logging.level
        )
        .into()
    });

    if logging.json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
