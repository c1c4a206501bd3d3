//! Authentication routes

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::auth;
use crate::state::AppState;

/// Create authentication routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/users/:address/nonce", get(auth::get_nonce))
        .route("/signin", post(auth::signin))
        .route("/welcome", get(auth::welcome))
}
