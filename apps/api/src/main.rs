use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use relay::config::Config;
use relay::llm_client::GroqClient;
use relay::routes::build_router;
use relay::state::AppState;
use relay::store::Store;

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

    info!("Starting Relay API v{}", env!("CARGO_PKG_VERSION"));

    // Open the record store (creates the directory layout on first run)
    let store = Arc::new(
        Store::open(config.store_config())
            .await
            .with_context(|| format!("Failed to open store at {}", config.data_dir.display()))?,
    );

    // Initialize LLM client
    let llm = Arc::new(GroqClient::new(config.groq_api_key.clone())?);
    info!("LLM client initialized (default model: {})", config.groq_model);

    let state = AppState::new(store.clone(), llm, config.clone());

    // Seed the live counters from disk
    let counters = state.aggregator.reconcile().await?;
    info!(
        "Loaded {} users, {} tickets ({} open)",
        counters.users, counters.tickets, counters.open_tickets
    );

    let background = relay::background::spawn_all(&state, &config);
    if config.admin_token.is_none() {
        warn!("ADMIN_TOKEN is not set; the admin API is unauthenticated");
    }

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    for task in background {
        task.abort();
    }
    store.persist_index().await?;
    info!("Index persisted, shutting down");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}
