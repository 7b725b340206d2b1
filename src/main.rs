//! Carousel Proxy Rotation Server - Entry Point
//!
//! Loads the client store, starts the HTTP server, and handles graceful
//! shutdown.

use std::sync::Arc;

use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod config;
mod egress;
mod error;
mod models;
mod store;

use api::ApiServer;
use config::Config;
use store::{BlockedProxies, ClientStore};

#[tokio::main]
async fn main() -> error::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "carousel=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Carousel Proxy Rotation Server");

    // Load configuration
    let config = Config::from_env()?;
    info!("Configuration loaded");

    // Load the client store (creates the file on first run)
    let store = Arc::new(ClientStore::load(&config.store.path).await?);

    let (total_clients, total_proxies) = store.totals();
    if total_clients == 0 {
        info!("No clients configured - use the management API to add clients");
    } else {
        info!(
            clients = total_clients,
            proxies = total_proxies,
            "Loaded client store"
        );
        for (name, proxies, _) in store.list() {
            info!(client = %name, proxies, "Loaded client");
        }
    }

    let overlapping = store.overlapping_count();
    if overlapping == 0 {
        info!("Fully isolated proxy pools - safe for concurrent rotation");
    } else {
        warn!(
            overlapping,
            "Some proxies are shared between clients"
        );
    }

    let blocked = Arc::new(BlockedProxies::new());

    // Create the server
    let server = ApiServer::new(config.clone(), store, blocked);

    // Create shutdown channel
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let server_task = tokio::spawn(async move {
        if let Err(e) = server.run(shutdown_rx).await {
            error!("Server error: {}", e);
        }
    });

    info!(
        "Server started - {}:{} (public host: {})",
        config.server.host, config.server.port, config.server.public_host
    );

    // Wait for shutdown signal
    shutdown_signal().await;
    info!("Shutdown signal received");

    let _ = shutdown_tx.send(true);
    let _ = server_task.await;

    info!("Carousel stopped");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
