//! Tunnel Keys - chat-driven API token management
//!
//! Walks users through creating, regenerating, listing and revoking tunnel
//! tokens, one question at a time.

mod api;
mod config;
mod conv;
mod db;
mod provider;
mod service;

use api::{create_router, AppService, AppState};
use config::AppConfig;
use db::Database;
use provider::{HttpTokenProvider, LoggingProvider};
use service::{DatabaseRepo, TokenProvider, UserRepo};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tunnel_keys=info,tower_http=info".into());
    if config.log_text {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false),
            )
            .init();
    }

    // Ensure database directory exists
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Initialize database
    tracing::info!(path = %config.db_path.display(), "Opening database");
    let db = Database::open(&config.db_path)?;
    let repo: Arc<dyn UserRepo> = Arc::new(DatabaseRepo::new(db, config.conversation_ttl));

    // Token provider
    let http = HttpTokenProvider::new(&config.provider_url, config.provider_timeout)?;
    let provider: Arc<dyn TokenProvider> = Arc::new(LoggingProvider::new(Arc::new(http)));
    tracing::info!(
        url = %config.provider_url,
        timeout_secs = config.provider_timeout.as_secs(),
        "Token provider configured"
    );

    let service = AppService::new(repo, provider);
    let app = create_router(AppState::new(service, config.max_concurrent));

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Tunnel Keys server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
