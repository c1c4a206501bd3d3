//! Session-token extraction
//!
//! `AuthenticatedAccount` resolves a `Bearer` JWT to a registered account.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use chrono::{DateTime, Utc};

use crate::auth::{Address, AuthError, AuthService, JwtError};
use crate::error::ErrorResponse;

/// Account behind a valid session token
#[derive(Debug, Clone)]
pub struct AuthenticatedAccount {
    pub address: Address,
    pub last_authenticated_at: Option<DateTime<Utc>>,
}

/// Why a session token was refused. Always rendered as 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionRejection {
    MissingToken,
    Expired,
    UnknownAccount,
    Invalid,
}

impl SessionRejection {
    fn code(self) -> &'static str {
        match self {
            SessionRejection::MissingToken => "MISSING_TOKEN",
            SessionRejection::Expired => "TOKEN_EXPIRED",
            SessionRejection::UnknownAccount => "UNKNOWN_ACCOUNT",
            SessionRejection::Invalid => "INVALID_TOKEN",
        }
    }

    fn message(self) -> &'static str {
        match self {
            SessionRejection::MissingToken => "Authorization header with Bearer token required",
            SessionRejection::Expired => "Token has expired",
            SessionRejection::UnknownAccount => "Token subject is not registered",
            SessionRejection::Invalid => "Invalid token",
        }
    }
}

impl From<&AuthError> for SessionRejection {
    fn from(err: &AuthError) -> Self {
        match err {
            AuthError::InvalidToken(JwtError::TokenExpired) => SessionRejection::Expired,
            AuthError::NotFound => SessionRejection::UnknownAccount,
            _ => SessionRejection::Invalid,
        }
    }
}

impl IntoResponse for SessionRejection {
    fn into_response(self) -> Response {
        let body = ErrorResponse::new(self.code(), self.message());
        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

/// Handlers taking this argument only run for a signed-in address.
///
/// ```rust,ignore
/// async fn welcome(account: AuthenticatedAccount) -> String {
///     format!("Welcome, {}", account.address)
/// }
/// ```
#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedAccount
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = SessionRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| SessionRejection::MissingToken)?;

        let account = Arc::<AuthService>::from_ref(state)
            .authenticate(bearer.token())
            .map_err(|e| {
                let rejection = SessionRejection::from(&e);
                tracing::debug!(error = %e, code = rejection.code(), "Session token rejected");
                rejection
            })?;

        Ok(AuthenticatedAccount {
            address: account.address,
            last_authenticated_at: account.last_authenticated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_from_auth_error() {
        assert_eq!(
            SessionRejection::from(&AuthError::InvalidToken(JwtError::TokenExpired)),
            SessionRejection::Expired
        );
        assert_eq!(
            SessionRejection::from(&AuthError::NotFound),
            SessionRejection::UnknownAccount
        );
        assert_eq!(
            SessionRejection::from(&AuthError::InvalidToken(JwtError::DecodingFailed(
                "InvalidSignature".to_string()
            ))),
            SessionRejection::Invalid
        );
    }

    #[test]
    fn test_rejection_is_unauthorized() {
        let response = SessionRejection::MissingToken.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
