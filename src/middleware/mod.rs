//! Middleware for the auth API
//!
//! Request tracing, security headers and session-token extraction.

pub mod auth;
mod security;
mod tracing;

pub use auth::{AuthenticatedAccount, SessionRejection};
pub use security::security_headers;
pub use tracing::request_tracing;
