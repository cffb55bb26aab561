mod config;
mod db;
mod errors;
mod llm_engine;
mod models;
mod qa;
mod records;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::llm_engine::{download, llama::LlamaEngine, Engine, EngineCell};
use crate::qa::Answerer;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Portfolio AI API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize SQLite
    let db = create_pool(&config.database_url).await?;

    // Fetch the model artifact if it is missing. Failure is not fatal: the
    // service still serves the record API and /ask degrades to a sentinel.
    if let Err(e) = download::ensure_model(&config.model_path, &config.model_url).await {
        error!("Model download failed: {e:#}");
    }

    // Process-wide engine cell; the loader runs at most once.
    let engine_config = config.engine_config();
    let engine = Arc::new(EngineCell::new(Box::new(move || {
        LlamaEngine::load(&engine_config).map(|e| Arc::new(e) as Arc<dyn Engine>)
    })));

    // Eager initialization so the first question does not pay the load cost.
    // A failed load is terminal for this process; we log it and serve degraded.
    {
        let engine = engine.clone();
        tokio::task::spawn_blocking(move || {
            if let Err(e) = engine.get_or_load() {
                error!("Engine initialization failed: {e}");
            }
        })
        .await?;
    }
    if engine.is_ready() {
        info!("Inference engine ready");
    }

    let answerer = Arc::new(Answerer::new(
        engine,
        config.cache_capacity,
        config.generation_params(),
    ));
    info!("Answer orchestrator initialized");

    // Build app state
    let state = AppState { db, answerer };

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
