//! HTTP server implementation
//!
//! Serves the end-client rotation surface, the management API used by
//! the operator/bot layer, and the unauthenticated status pages.

pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;

pub use server::ApiServer;
