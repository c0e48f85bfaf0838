//! Car Insights REST API server
//!
//! Loads both CSV datasets, then serves the report endpoints until
//! Ctrl+C or SIGTERM.

use std::net::SocketAddr;

use anyhow::Context;
use clap::Parser;
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use car_insights::{create_router, AppState, Dataset, ServerConfig, REPORTS};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::parse();

    // A missing or malformed dataset stops the service here.
    info!(
        car_details = %config.car_details.display(),
        price_details = %config.price_details.display(),
        "Loading datasets"
    );
    let dataset = Dataset::load(&config.car_details, &config.price_details)
        .context("Failed to load datasets")?;

    let app = create_router(AppState::new(dataset));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid address")?;
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(reports = REPORTS.len(), "Starting server on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, stopping server");
}
