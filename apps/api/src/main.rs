mod config;
mod controller;
mod errors;
mod export;
mod generation;
mod layout;
mod llm_client;
mod routes;
mod state;
mod story;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::config::Config;
use crate::generation::GeminiStoryGenerator;
use crate::llm_client::GenAiClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on a missing API key)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting DreamWeaver API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize generation client
    let client = GenAiClient::new(config.gemini_api_key.clone(), config.genai_base_url.clone())?;
    info!(
        "Generation client initialized (text: {}, image: {})",
        llm_client::TEXT_MODEL,
        llm_client::IMAGE_MODEL
    );
    let generator = Arc::new(GeminiStoryGenerator::new(client));

    // Build app state
    let state = AppState::new(config.clone(), generator);
    info!(
        concurrency = state.illustration_policy.concurrency,
        retries = state.illustration_policy.retries,
        "Illustration policy"
    );

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
