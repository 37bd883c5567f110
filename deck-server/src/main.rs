use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

use deck_core::ShufflePlanner;
use deck_persistence::{DeckRepository, StorageWorker, connection::connect_and_migrate};
use deck_server::{config::Config, create_routes, deck_service::DeckService};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting deck server...");

    if let Err(e) = run().await {
        error!("Deck server failed: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let config = Config::from_env().context("Invalid configuration")?;

    // Initialize database connection and run migrations
    let db = connect_and_migrate(&config.database_url)
        .await
        .context("Failed to connect to database and run migrations")?;

    // The worker is the only owner of the database from here on
    let repository = DeckRepository::new(db)
        .with_shuffle_planner(ShufflePlanner::new(config.shuffle_max_attempts));
    let storage = StorageWorker::spawn(repository);
    let deck_service = Arc::new(DeckService::new(storage));

    let routes = create_routes(deck_service, Arc::new(config.clone()));

    info!("Server starting on {}:{}", config.host, config.port);

    let (addr, server) = warp::serve(routes)
        .try_bind_with_graceful_shutdown((config.host, config.port), shutdown_signal())
        .with_context(|| format!("Failed to bind {}:{}", config.host, config.port))?;

    info!(
        "Server started successfully on {}. Press Ctrl+C to stop.",
        addr
    );
    server.await;
    info!("Server shutdown complete.");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM (Ctrl+C elsewhere).
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use signal::unix::{SignalKind, signal as unix_signal};

        match (
            unix_signal(SignalKind::interrupt()),
            unix_signal(SignalKind::terminate()),
        ) {
            (Ok(mut sigint), Ok(mut sigterm)) => {
                tokio::select! {
                    _ = sigint.recv() => {
                        info!("Received SIGINT, shutting down gracefully...");
                    }
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM, shutting down gracefully...");
                    }
                }
            }
            _ => {
                error!("Failed to install signal handlers, falling back to Ctrl+C");
                if signal::ctrl_c().await.is_ok() {
                    info!("Received Ctrl+C, shutting down gracefully...");
                }
            }
        }
    }

    #[cfg(not(unix))]
    {
        if signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }
}
