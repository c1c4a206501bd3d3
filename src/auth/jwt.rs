//! Session tokens
//!
//! A session is an HS256 JWT whose subject is the canonical address that
//! completed the handshake.

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::address::Address;

#[derive(Error, Debug)]
pub enum JwtError {
    #[error("Token encoding failed: {0}")]
    EncodingFailed(String),

    #[error("Token decoding failed: {0}")]
    DecodingFailed(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

/// Kind of credential carried in the `token_type` claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Canonical account address
    pub sub: String,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    pub token_type: TokenType,
}

impl Claims {
    /// The address this token was issued to
    pub fn address(&self) -> Result<Address, JwtError> {
        Address::parse(&self.sub).map_err(|e| JwtError::InvalidToken(e.to_string()))
    }
}

/// An issued session credential
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    pub address: Address,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Sign a session token for `address`, valid for `ttl_seconds`
pub fn generate_access_token(
    address: &Address,
    jti: &str,
    secret: &str,
    ttl_seconds: i64,
) -> Result<Session, JwtError> {
    // Claims carry whole seconds; truncate so the session matches them exactly.
    let issued_at = Utc
        .timestamp_opt(Utc::now().timestamp(), 0)
        .single()
        .ok_or_else(|| JwtError::EncodingFailed("clock out of range".to_string()))?;
    let expires_at = issued_at + Duration::seconds(ttl_seconds);

    let claims = Claims {
        sub: address.to_string(),
        jti: jti.to_string(),
        iat: issued_at.timestamp(),
        exp: expires_at.timestamp(),
        token_type: TokenType::Access,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| JwtError::EncodingFailed(e.to_string()))?;

    Ok(Session {
        token,
        address: address.clone(),
        issued_at,
        expires_at,
    })
}

/// Check signature, expiry and token type, returning the claims
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let mut validation = Validation::default();
    validation.validate_exp = true;

    // A token_type other than a known variant fails claim deserialization
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => JwtError::TokenExpired,
        _ => JwtError::DecodingFailed(e.to_string()),
    })?;

    Ok(token_data.claims)
}
