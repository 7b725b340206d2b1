//! API route definitions

use axum::routing::{delete, get, post};
use axum::Router;

use super::handlers;
use super::server::AppState;

/// Create the router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Status pages (no auth required)
        .route("/", get(handlers::status::summary))
        .route("/status", get(handlers::status::status))
        // End-client surface (Basic auth against the store)
        .route("/current", get(handlers::rotation::current_proxy))
        .route("/rotate", post(handlers::rotation::rotate_proxy))
        .route("/myip", get(handlers::rotation::my_ip))
        // Management surface (shared static credential)
        .nest("/api", management_routes())
        .with_state(state)
}

/// Routes reserved for the operator/bot layer
fn management_routes() -> Router<AppState> {
    Router::new()
        .route("/clients", get(handlers::clients::list_clients))
        .route("/add-client", post(handlers::clients::add_client))
        .route("/delete-client/:name", delete(handlers::clients::delete_client))
        // Alias kept for callers of the old path
        .route("/remove-client/:name", delete(handlers::clients::delete_client))
        .route("/add-proxy", post(handlers::clients::add_proxy))
        .route("/remove-proxy", delete(handlers::clients::remove_proxy))
        .route("/rotate-client", post(handlers::clients::rotate_client))
}
