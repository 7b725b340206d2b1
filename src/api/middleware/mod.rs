//! API middleware

mod auth;

pub use auth::{ClientAuth, ManagementAuth};
