mod config;
mod db;
mod errors;
mod jobs;
mod llm_client;
mod models;
mod notify;
mod pipeline;
mod resume;
mod routes;
mod scheduler;
mod sources;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::{create_pool, init_schema};
use crate::llm_client::LlmClient;
use crate::notify::JobNotifier;
use crate::pipeline::scorer::{JobScorer, KeywordScorer, LlmScorer};
use crate::routes::build_router;
use crate::scheduler::FetchScheduler;
use crate::sources::HttpJobSource;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (aborts on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting job tracker API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize SQLite
    let db = create_pool(&config.database_url).await?;
    init_schema(&db).await?;
    info!("Database ready at {}", config.database_url);

    // Initialize the scorer: LLM when a key is configured, keyword overlap otherwise
    let scorer: Arc<dyn JobScorer> = match &config.anthropic_api_key {
        Some(key) => {
            info!("LLM scorer initialized (model: {})", llm_client::MODEL);
            Arc::new(LlmScorer::new(LlmClient::new(key.clone())))
        }
        None => {
            info!("No ANTHROPIC_API_KEY set; scoring with keyword overlap");
            Arc::new(KeywordScorer)
        }
    };

    // Initialize the job source and WebSocket notifier
    let source = Arc::new(HttpJobSource::new(config.job_source_url.clone()));
    let notifier = JobNotifier::new();

    // Start the periodic fetch scheduler
    let fetch_scheduler = Arc::new(FetchScheduler::new(
        db.clone(),
        source,
        scorer,
        notifier.clone(),
        &config,
    ));
    fetch_scheduler.start();

    // Build app state
    let state = AppState {
        db,
        scheduler: fetch_scheduler,
        notifier,
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
