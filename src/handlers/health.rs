//! Service status handlers

use axum::{extract::State, Json};
use serde::Serialize;

use crate::state::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub environment: String,
    pub accounts: Option<usize>,
    pub version: String,
}

pub async fn root() -> &'static str {
    "Ethereum nonce authentication server"
}

/// GET /health - Liveness plus a store probe
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let accounts = match state.auth_service.account_count() {
        Ok(count) => Some(count),
        Err(e) => {
            tracing::error!(error = %e, "Account store unavailable");
            None
        }
    };

    let status = if accounts.is_some() {
        "healthy"
    } else {
        "unhealthy"
    };

    Json(HealthResponse {
        status: status.to_string(),
        environment: state.config.environment.as_str().to_string(),
        accounts,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
