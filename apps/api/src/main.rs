mod analysis;
mod analyzer;
mod cache;
mod config;
mod db;
mod errors;
mod models;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analyzer::{ClaudeAnalyzer, GapAnalyzer};
use crate::cache::coordinator::AnalysisCache;
use crate::cache::memory::MemoryTier;
use crate::cache::persistent::PersistentTier;
use crate::config::Config;
use crate::db::{create_pool, init_schema};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting SkillBridge API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL and bootstrap the analyses table
    let db = create_pool(&config.database_url).await?;
    init_schema(&db).await?;

    // Initialize the gap analyzer
    let analyzer: Arc<dyn GapAnalyzer> =
        Arc::new(ClaudeAnalyzer::new(config.anthropic_api_key.clone()));
    info!("Gap analyzer initialized (model: {})", analyzer::MODEL);

    // Build the two-tier cache: in-process memory in front of Postgres
    let memory = Arc::new(MemoryTier::new());
    let persistent = Arc::new(PersistentTier::new(db.clone()));
    let analysis_cache = Arc::new(AnalysisCache::new(memory, persistent));
    info!("Analysis cache initialized (memory + persistent tiers)");

    // Build app state
    let state = AppState {
        db,
        cache: analysis_cache,
        analyzer,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
