//! Authentication HTTP handlers
//!
//! Endpoints for the wallet challenge-response handshake.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AuthenticatedAccount;
use crate::auth::{Address, Nonce};
use crate::error::ApiResult;
use crate::state::AppState;

/// Request body for registration
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub address: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub address: Address,
}

#[derive(Debug, Serialize)]
pub struct NonceResponse {
    pub nonce: Nonce,
}

/// Request body for sign-in
#[derive(Debug, Deserialize)]
pub struct SigninRequest {
    pub address: String,
    pub nonce: String,
    /// Hex-encoded `personal_sign` signature
    pub signature: String,
}

#[derive(Debug, Serialize)]
pub struct SigninResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub address: Address,
}

#[derive(Debug, Serialize)]
pub struct WelcomeResponse {
    pub address: Address,
    pub message: String,
    pub last_authenticated_at: Option<DateTime<Utc>>,
}

/// POST /register - Register an address and bind its first nonce
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    let Json(req) = payload?;
    let account = state.auth_service.register(&req.address)?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            address: account.address,
        }),
    ))
}

/// GET /users/:address/nonce - Current challenge nonce for an address
pub async fn get_nonce(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<Json<NonceResponse>> {
    let Path(address) = path?;
    let nonce = state.auth_service.get_challenge(&address)?;

    Ok(Json(NonceResponse { nonce }))
}

/// POST /signin - Verify the signed nonce and issue a session token
pub async fn signin(
    State(state): State<AppState>,
    payload: Result<Json<SigninRequest>, JsonRejection>,
) -> ApiResult<Json<SigninResponse>> {
    let Json(req) = payload?;
    let session = state
        .auth_service
        .login(&req.address, &req.nonce, &req.signature)?;

    Ok(Json(SigninResponse {
        token: session.token,
        token_type: "Bearer".to_string(),
        expires_in: state.auth_service.access_token_ttl_seconds(),
        address: session.address,
    }))
}

/// GET /welcome - Greet the holder of a valid session token
pub async fn welcome(account: AuthenticatedAccount) -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: format!("Welcome, {}", account.address),
        address: account.address,
        last_authenticated_at: account.last_authenticated_at,
    })
}
