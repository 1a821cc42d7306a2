// Main entry point for the probe API server

use std::sync::Arc;

use anyhow::{Context, Result};
use probe_server::{
    server::{build_app, build_probe},
    Config,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,vendor_probe=debug,probe_server=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting vendor probe API");

    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(?config, "Configuration loaded");

    let probe = build_probe(&config)?;
    let app = build_app(Arc::new(probe));

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
