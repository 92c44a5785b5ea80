use anyhow::Context;
use mimalloc::MiMalloc;
use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use repair_booking::{
    config::{Config, LogFormat},
    controllers,
    services::cleanup::CleanupService,
    AppState,
};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    let registry = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.app.rust_log));
    match config.app.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
    config.log_invalid_vars();

    info!(
        "Starting Repair Booking API ({}, default language {})",
        config.app.environment, config.app.language
    );

    // Create the shared application state
    let app_state = AppState::new(config.clone())
        .await
        .context("failed to build application state")?;

    // --- Start background tasks ---

    // Abandoned wizard sessions are dropped together with their drafts
    CleanupService::new(app_state.clone()).spawn();

    // --- Start the web server ---

    let app = controllers::app(app_state);

    let addr: SocketAddr = format!("{}:{}", config.app.host, config.app.port)
        .parse()
        .context("HOST/PORT do not form a valid socket address")?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app.into_make_service())
        .await
        .context("server error")?;

    Ok(())
}
