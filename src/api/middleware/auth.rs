//! Basic-auth extractors for the two authentication schemes
//!
//! The schemes are independent and never interchanged: end-clients
//! authenticate against the credential store and get a Basic challenge
//! on failure; the management API uses one shared static credential and
//! is rejected without a challenge header.

use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use tracing::{debug, warn};

use crate::api::server::AppState;
use crate::error::CarouselError;
use crate::store::secrets_match;

/// Proof that the request carried the shared management credential
#[derive(Debug, Clone, Copy)]
pub struct ManagementAuth;

/// An end-client authenticated against the credential store
#[derive(Debug, Clone)]
pub struct ClientAuth {
    pub name: String,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for ManagementAuth {
    type Rejection = CarouselError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let (username, password) =
            decode_basic(parts).ok_or(CarouselError::ManagementAuthFailed)?;

        let user_ok = secrets_match(&username, &state.config.management.username);
        let pass_ok = secrets_match(&password, &state.config.management.password);

        if user_ok && pass_ok {
            Ok(ManagementAuth)
        } else {
            warn!("Management authentication failed");
            Err(CarouselError::ManagementAuthFailed)
        }
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for ClientAuth {
    type Rejection = CarouselError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let (username, password) =
            decode_basic(parts).ok_or(CarouselError::AuthenticationFailed)?;

        // Unknown usernames and wrong passwords are indistinguishable.
        if state.store.verify_secret(&username, &password) {
            debug!(client = %username, "Client authentication successful");
            Ok(ClientAuth { name: username })
        } else {
            warn!(client = %username, "Client authentication failed");
            Err(CarouselError::AuthenticationFailed)
        }
    }
}

/// Parse "Basic <base64(user:pass)>" out of the Authorization header
fn decode_basic(parts: &Parts) -> Option<(String, String)> {
    let auth_header = parts
        .headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?;

    let encoded = auth_header.strip_prefix("Basic ")?;
    let decoded = BASE64.decode(encoded).ok()?;
    let credentials = String::from_utf8(decoded).ok()?;

    let (user, pass) = credentials.split_once(':')?;
    Some((user.to_string(), pass.to_string()))
}
