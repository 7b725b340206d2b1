//! Unauthenticated status endpoints

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use sysinfo::System;

use crate::api::server::AppState;

/// Server status: counts, uptime, and memory figures
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let (total_clients, total_proxies) = state.store.totals();

    let mut sys = System::new_all();
    sys.refresh_all();

    let process_rss = sysinfo::get_current_pid()
        .ok()
        .and_then(|pid| sys.process(pid))
        .map(|p| p.memory())
        .unwrap_or(0);

    Json(json!({
        "status": "running",
        "clients": total_clients,
        "proxies": total_proxies,
        "blocked": state.blocked.len(),
        "uptime": state.started_at.elapsed().as_secs(),
        "memory": {
            "processRss": process_rss,
            "systemUsed": sys.used_memory(),
            "systemTotal": sys.total_memory(),
        },
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Human-readable summary page. Never prints credentials.
pub async fn summary(State(state): State<AppState>) -> impl IntoResponse {
    let (total_clients, total_proxies) = state.store.totals();
    let overlapping = state.store.overlapping_count();

    format!(
        "Carousel Proxy Rotator v{version}\n\
         Public host: {public_host}\n\
         \n\
         Clients: {clients}\n\
         Proxies: {proxies} ({overlapping} shared between clients)\n\
         Blocked proxies: {blocked}\n\
         \n\
         Client API (Basic auth):\n\
         GET /status - server status\n\
         GET /current - current proxy\n\
         GET /myip - egress IP through the current proxy\n\
         POST /rotate - rotate to the next proxy\n\
         \n\
         Management API:\n\
         GET /api/clients - list all clients\n\
         POST /api/add-client - add new client\n\
         DELETE /api/delete-client/:name - delete client\n\
         DELETE /api/remove-client/:name - delete client (alias)\n\
         POST /api/add-proxy - add proxy to client\n\
         DELETE /api/remove-proxy - remove proxy from client\n\
         POST /api/rotate-client - rotate proxy for client\n",
        version = env!("CARGO_PKG_VERSION"),
        public_host = state.config.server.public_host,
        clients = total_clients,
        proxies = total_proxies,
        overlapping = overlapping,
        blocked = state.blocked.len(),
    )
}
