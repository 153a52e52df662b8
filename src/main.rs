//! Repository Ingestion Service - Main Entry Point
//!
//! Accepts ingestion triggers over HTTP and streams extracted chunks to the
//! embedding service.

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use repo_ingest::api::{self, AppState};
use repo_ingest::output::EmbeddingClient;
use repo_ingest::pipeline::IngestionPipeline;
use repo_ingest::repository::GitLabProvider;
use repo_ingest::types::IngestConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "repo_ingest=info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = IngestConfig::from_env();

    info!("Starting Repository Ingestion Service v{}", env!("CARGO_PKG_VERSION"));
    info!(clone_root = %config.clone_root.display(), "Working copies are cloned under clone root");

    // Initialize components
    let timeout = Duration::from_secs(config.sink_timeout_secs);
    let sink = EmbeddingClient::with_timeout(&config.embedding_service_url, timeout);
    if !sink.health_check().await {
        warn!(url = %config.embedding_service_url, "Embedding service is not reachable yet");
    }
    let pipeline = IngestionPipeline::new(Arc::new(GitLabProvider::new(timeout)), &config);

    let state = Arc::new(AppState::new(pipeline, Arc::new(sink), config));

    // Build HTTP routes
    let app = api::router(state)
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    // Start server
    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3019);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
