//! HTTP server using Axum
//!
//! One server carries all three surfaces: the end-client rotation
//! endpoints, the management API, and the unauthenticated status pages.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use crate::config::Config;
use crate::error::{CarouselError, Result};
use crate::store::{BlockedProxies, ClientStore};

use super::routes;

/// Shared state for request handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<ClientStore>,
    pub blocked: Arc<BlockedProxies>,
    pub started_at: Instant,
}

/// The Carousel HTTP server
pub struct ApiServer {
    state: AppState,
}

impl ApiServer {
    /// Create a new server over the loaded store
    pub fn new(config: Config, store: Arc<ClientStore>, blocked: Arc<BlockedProxies>) -> Self {
        let state = AppState {
            config,
            store,
            blocked,
            started_at: Instant::now(),
        };

        Self { state }
    }

    /// Build the router
    fn build_router(&self) -> Router {
        routes::create_router(self.state.clone()).layer(TraceLayer::new_for_http())
    }

    /// Run the server until the shutdown signal flips
    #[instrument(skip(self, shutdown))]
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let addr: SocketAddr = self
            .state
            .config
            .server_addr()
            .parse()
            .map_err(|e| CarouselError::InvalidConfig(format!("invalid bind address: {}", e)))?;

        let router = self.build_router();

        info!("Server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.changed().await;
            })
            .await
            .map_err(|e| CarouselError::Internal(e.to_string()))?;

        info!("Server shut down");
        Ok(())
    }
}
