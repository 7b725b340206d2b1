use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Unified error type for the Carousel application
#[derive(Error, Debug)]
pub enum CarouselError {
    // Request validation errors
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid proxy format: {0}")]
    InvalidProxy(String),

    #[error("{rejected} proxy entries rejected")]
    ProxyBatchRejected { rejected: usize, entries: Vec<String> },

    // Lookup errors
    #[error("Client {0} not found")]
    ClientNotFound(String),

    #[error("Proxy not found for this client")]
    ProxyNotFound,

    #[error("No proxies available")]
    NoProxies,

    // Conflicts
    #[error("Client {0} already exists")]
    ClientExists(String),

    #[error("Proxy already exists for this client")]
    DuplicateProxy,

    // Pool state (management surface reports an empty pool as a bad request)
    #[error("Client {0} has no proxies")]
    EmptyPool(String),

    // Authentication errors
    #[error("Invalid credentials")]
    AuthenticationFailed,

    #[error("Invalid API credentials")]
    ManagementAuthFailed,

    // Upstream / egress errors
    #[error("Upstream request failed: {0}")]
    Upstream(String),

    // Persistence errors
    #[error("Failed to persist store: {0}")]
    Persistence(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Carousel operations
pub type Result<T> = std::result::Result<T, CarouselError>;

impl CarouselError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            CarouselError::InvalidRequest(_)
            | CarouselError::InvalidProxy(_)
            | CarouselError::ProxyBatchRejected { .. }
            | CarouselError::EmptyPool(_)
            | CarouselError::InvalidConfig(_) => StatusCode::BAD_REQUEST,

            // 401 Unauthorized
            CarouselError::AuthenticationFailed | CarouselError::ManagementAuthFailed => {
                StatusCode::UNAUTHORIZED
            }

            // 404 Not Found
            CarouselError::ClientNotFound(_)
            | CarouselError::ProxyNotFound
            | CarouselError::NoProxies => StatusCode::NOT_FOUND,

            // 409 Conflict
            CarouselError::ClientExists(_) | CarouselError::DuplicateProxy => StatusCode::CONFLICT,

            // 500 Internal Server Error
            CarouselError::Upstream(_)
            | CarouselError::Persistence(_)
            | CarouselError::Io(_)
            | CarouselError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Check if this is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Check if this is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}

impl IntoResponse for CarouselError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match &self {
            // Batch rejections carry the offending entries so the operator
            // can fix them without re-reading logs.
            CarouselError::ProxyBatchRejected { entries, .. } => json!({
                "error": self.to_string(),
                "rejected": entries,
            }),
            _ => json!({
                "error": self.to_string(),
            }),
        };

        // End-client Basic auth gets the challenge header; the management
        // scheme intentionally does not (bearer-style rejection).
        if matches!(self, CarouselError::AuthenticationFailed) {
            return (
                status,
                [(header::WWW_AUTHENTICATE, "Basic realm=\"Proxy Server\"")],
                Json(body),
            )
                .into_response();
        }

        (status, Json(body)).into_response()
    }
}

impl From<serde_json::Error> for CarouselError {
    fn from(err: serde_json::Error) -> Self {
        CarouselError::Persistence(err.to_string())
    }
}

impl From<url::ParseError> for CarouselError {
    fn from(err: url::ParseError) -> Self {
        CarouselError::InvalidProxy(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_code_mapping() {
        assert_eq!(
            CarouselError::InvalidRequest("bad".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            CarouselError::InvalidProxy("bad".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            CarouselError::EmptyPool("acct1".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            CarouselError::AuthenticationFailed.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            CarouselError::ManagementAuthFailed.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            CarouselError::ClientNotFound("acct1".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(CarouselError::NoProxies.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            CarouselError::ClientExists("acct1".to_string()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            CarouselError::DuplicateProxy.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            CarouselError::Upstream("timeout".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            CarouselError::Persistence("disk full".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_client_server_helpers() {
        assert!(CarouselError::InvalidRequest("bad".to_string()).is_client_error());
        assert!(!CarouselError::InvalidRequest("bad".to_string()).is_server_error());

        assert!(CarouselError::Upstream("down".to_string()).is_server_error());
        assert!(!CarouselError::Upstream("down".to_string()).is_client_error());
    }

    #[test]
    fn test_client_auth_failure_carries_basic_challenge() {
        let response = CarouselError::AuthenticationFailed.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response
                .headers()
                .get(header::WWW_AUTHENTICATE)
                .unwrap()
                .to_str()
                .unwrap(),
            "Basic realm=\"Proxy Server\""
        );
    }

    #[test]
    fn test_management_auth_failure_has_no_challenge() {
        let response = CarouselError::ManagementAuthFailed.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());
    }
}
