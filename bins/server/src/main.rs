//! Clubdocs API Server
//!
//! Main entry point for the document management backend.

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clubdocs_api::{AppState, create_router};
use clubdocs_core::storage::{StorageConfig, StorageService};
use clubdocs_db::connect_with;
use clubdocs_shared::{AppConfig, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clubdocs=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Connect to database
    let db = connect_with(&config.database).await?;
    info!("Connected to database");

    // Object storage
    let storage = StorageService::from_config(StorageConfig::from_settings(&config.storage))?;
    info!(
        provider = storage.provider_name(),
        public_base_url = ?config.storage.public_base_url,
        "Object storage configured"
    );

    let max_request_size = usize::try_from(config.storage.max_request_size_bytes)
        .context("storage.max_request_size_bytes does not fit in memory")?;

    // Create application state
    let state = AppState::new(
        db,
        JwtService::new(&config.jwt),
        storage,
        config.documents.clone(),
        max_request_size,
    );

    // Create router
    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
