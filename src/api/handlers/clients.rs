//! Management handlers: client and proxy-pool CRUD
//!
//! Thin orchestration over the store. Every mutation of the client
//! table is flushed to disk before the response is produced, so a
//! successful answer means the change is durable.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use tracing::info;

use crate::api::middleware::ManagementAuth;
use crate::api::server::AppState;
use crate::error::CarouselError;
use crate::models::{
    AddClientRequest, AddProxyRequest, ClientSummary, RemoveProxyRequest, RotateClientRequest,
};

/// List all clients with pool sizes and cursors
pub async fn list_clients(
    State(state): State<AppState>,
    _auth: ManagementAuth,
) -> Result<impl IntoResponse, CarouselError> {
    let mut clients = serde_json::Map::new();
    for (name, proxies, current_index) in state.store.list() {
        clients.insert(
            name,
            serde_json::to_value(ClientSummary {
                proxies,
                current_index,
            })
            .map_err(|e| CarouselError::Internal(e.to_string()))?,
        );
    }

    let (total_clients, total_proxies) = state.store.totals();

    Ok(Json(json!({
        "success": true,
        "clients": clients,
        "totalClients": total_clients,
        "totalProxies": total_proxies,
    })))
}

/// Register a new client with an optional initial proxy batch
pub async fn add_client(
    State(state): State<AppState>,
    _auth: ManagementAuth,
    Json(req): Json<AddClientRequest>,
) -> Result<impl IntoResponse, CarouselError> {
    if req.client_name.trim().is_empty() || req.password.is_empty() {
        return Err(CarouselError::InvalidRequest(
            "clientName and password are required".to_string(),
        ));
    }

    let accepted = state
        .store
        .create_client(&req.client_name, &req.password, &req.proxies)?;
    state.store.flush().await?;

    let (total_clients, _) = state.store.totals();
    info!(client = %req.client_name, proxies = accepted, "Added client");

    Ok(Json(json!({
        "success": true,
        "message": format!("Client {} added successfully", req.client_name),
        "clientName": req.client_name,
        "validProxies": accepted,
        "invalidProxies": 0,
        "totalClients": total_clients,
    })))
}

/// Delete a client and everything keyed by its name
pub async fn delete_client(
    State(state): State<AppState>,
    _auth: ManagementAuth,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, CarouselError> {
    let deleted_proxies = state.store.delete_client(&name)?;
    state.store.flush().await?;

    let (total_clients, _) = state.store.totals();
    info!(client = %name, proxies = deleted_proxies, "Deleted client");

    Ok(Json(json!({
        "success": true,
        "message": format!("Client {} deleted successfully", name),
        "deletedProxies": deleted_proxies,
        "totalClients": total_clients,
    })))
}

/// Append one proxy to a client's pool
pub async fn add_proxy(
    State(state): State<AppState>,
    _auth: ManagementAuth,
    Json(req): Json<AddProxyRequest>,
) -> Result<impl IntoResponse, CarouselError> {
    if req.client_name.trim().is_empty() || req.proxy.trim().is_empty() {
        return Err(CarouselError::InvalidRequest(
            "clientName and proxy are required".to_string(),
        ));
    }

    let total_proxies = state.store.add_proxy(&req.client_name, &req.proxy)?;
    state.store.flush().await?;

    info!(client = %req.client_name, total = total_proxies, "Added proxy");

    Ok(Json(json!({
        "success": true,
        "message": format!("Proxy added to client {}", req.client_name),
        "clientName": req.client_name,
        "totalProxies": total_proxies,
    })))
}

/// Remove one proxy from a client's pool by canonical-form match
pub async fn remove_proxy(
    State(state): State<AppState>,
    _auth: ManagementAuth,
    Json(req): Json<RemoveProxyRequest>,
) -> Result<impl IntoResponse, CarouselError> {
    if req.client_name.trim().is_empty() || req.proxy.trim().is_empty() {
        return Err(CarouselError::InvalidRequest(
            "clientName and proxy are required".to_string(),
        ));
    }

    let (removed, total_proxies) = state.store.remove_proxy(&req.client_name, &req.proxy)?;
    state.store.flush().await?;

    info!(client = %req.client_name, proxy = %removed, "Removed proxy");

    Ok(Json(json!({
        "success": true,
        "message": format!("Proxy removed from client {}", req.client_name),
        "clientName": req.client_name,
        "removedProxy": removed.canonical(),
        "totalProxies": total_proxies,
    })))
}

/// Advance a client's rotation cursor on the operator's behalf.
/// The cursor is ephemeral process state, so there is nothing to flush.
pub async fn rotate_client(
    State(state): State<AppState>,
    _auth: ManagementAuth,
    Json(req): Json<RotateClientRequest>,
) -> Result<impl IntoResponse, CarouselError> {
    if req.client_name.trim().is_empty() {
        return Err(CarouselError::InvalidRequest(
            "clientName is required".to_string(),
        ));
    }

    let (proxy, index, total) = state.store.rotate(&req.client_name).map_err(|e| match e {
        // The management surface reports an empty pool as a bad request.
        CarouselError::NoProxies => CarouselError::EmptyPool(req.client_name.clone()),
        other => other,
    })?;

    info!(client = %req.client_name, index, "Rotated proxy");

    Ok(Json(json!({
        "success": true,
        "message": format!("Proxy rotated for client {}", req.client_name),
        "clientName": req.client_name,
        "currentIndex": index,
        "currentProxy": proxy.canonical(),
        "totalProxies": total,
    })))
}
