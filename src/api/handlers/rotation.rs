//! End-client handlers: current proxy, rotation, and the egress IP check

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use tracing::{info, warn};

use crate::api::middleware::ClientAuth;
use crate::api::server::AppState;
use crate::egress;
use crate::error::CarouselError;

/// Return the proxy at the cursor without advancing it
pub async fn current_proxy(
    State(state): State<AppState>,
    auth: ClientAuth,
) -> Result<impl IntoResponse, CarouselError> {
    let (proxy, index, total) = state.store.current(&auth.name)?;

    Ok(Json(json!({
        "client": auth.name,
        "currentProxy": proxy.canonical(),
        "index": index,
        "totalProxies": total,
    })))
}

/// Advance the cursor to the next proxy in the pool
pub async fn rotate_proxy(
    State(state): State<AppState>,
    auth: ClientAuth,
) -> Result<impl IntoResponse, CarouselError> {
    let (proxy, index, total) = state.store.rotate(&auth.name)?;

    info!(client = %auth.name, index, "Rotated to proxy {}", proxy);

    Ok(Json(json!({
        "success": true,
        "client": auth.name,
        "newProxy": proxy.canonical(),
        "index": index,
        "totalProxies": total,
    })))
}

/// Fetch the egress IP through the current proxy.
///
/// The proxy is cloned out of the store before the outbound call, so a
/// slow upstream cannot stall rotation on this client. A failed check
/// flags the proxy in the advisory blocked set; it is never excluded
/// from rotation.
pub async fn my_ip(
    State(state): State<AppState>,
    auth: ClientAuth,
) -> Result<impl IntoResponse, CarouselError> {
    let (proxy, index, _) = state.store.current(&auth.name)?;

    match egress::check_egress_ip(&proxy, &state.config.egress).await {
        Ok(ip) => Ok(Json(json!({
            "ip": ip,
            "client": auth.name,
            "proxy": proxy.canonical(),
            "index": index,
        }))),
        Err(e) => {
            warn!(client = %auth.name, proxy = %proxy, "IP check failed: {}", e);
            state.blocked.insert(proxy.canonical());
            Err(e)
        }
    }
}
