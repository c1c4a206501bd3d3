//! Authentication service
//!
//! Drives the register → challenge → sign-in handshake for an address.
//! Every step is synchronous; the only shared state is the user store.

use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use super::address::{Address, AddressError};
use super::crypto::verify_nonce_signature;
use super::jwt::{generate_access_token, verify_token, JwtError, Session};
use super::nonce::{Nonce, NonceError, NonceGenerator};
use crate::store::{Account, StoreError, UserStore};

/// Auth service errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid address: {0}")]
    InvalidAddress(#[from] AddressError),

    #[error("Address already registered")]
    Conflict,

    #[error("Address not registered")]
    NotFound,

    #[error("Nonce does not match the current challenge")]
    NonceMismatch,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Invalid session token: {0}")]
    InvalidToken(#[from] JwtError),

    #[error("Internal failure: {0}")]
    Internal(String),
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::AlreadyExists => AuthError::Conflict,
            StoreError::NotFound => AuthError::NotFound,
            StoreError::NonceMismatch => AuthError::NonceMismatch,
            StoreError::Internal(msg) => AuthError::Internal(msg),
        }
    }
}

impl From<NonceError> for AuthError {
    fn from(e: NonceError) -> Self {
        AuthError::Internal(e.to_string())
    }
}

/// Where an address stands in the handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Unregistered,
    NonceIssued,
    Authenticated,
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn UserStore>,
    nonces: Arc<dyn NonceGenerator>,
    jwt_secret: String,
    access_token_ttl_seconds: i64,
}

impl AuthService {
    /// Create a new AuthService
    pub fn new(
        store: Arc<dyn UserStore>,
        nonces: Arc<dyn NonceGenerator>,
        jwt_secret: String,
        access_token_ttl_seconds: i64,
    ) -> Self {
        Self {
            store,
            nonces,
            jwt_secret,
            access_token_ttl_seconds,
        }
    }

    /// Register a new address with a fresh challenge nonce
    pub fn register(&self, raw_address: &str) -> Result<Account, AuthError> {
        let address = Address::parse(raw_address)?;
        let nonce = self.nonces.generate()?;

        let account = self.store.create_if_absent(&address, nonce)?;
        tracing::info!(address = %address, "Address registered");

        Ok(account)
    }

    /// Fetch the live challenge nonce for a registered address
    pub fn get_challenge(&self, raw_address: &str) -> Result<Nonce, AuthError> {
        let address = Address::parse(raw_address)?;
        let account = self.store.issue_challenge(&address)?;

        Ok(account.current_nonce)
    }

    /// Verify a signed challenge and issue a session
    ///
    /// The nonce is consumed before the signature is checked and is not
    /// restored on failure; the client must fetch a new challenge to retry.
    pub fn login(
        &self,
        raw_address: &str,
        nonce: &str,
        signature: &str,
    ) -> Result<Session, AuthError> {
        let address = Address::parse(raw_address)?;

        let account = self
            .store
            .consume_and_rotate(&address, nonce)
            .map_err(|e| {
                tracing::warn!(address = %address, error = %e, "Challenge consumption rejected");
                AuthError::from(e)
            })?;

        if !verify_nonce_signature(&address, &account.current_nonce, signature) {
            tracing::warn!(address = %address, "Signature verification failed");
            return Err(AuthError::InvalidSignature);
        }

        let jti = Uuid::new_v4().to_string();
        let session = generate_access_token(
            &address,
            &jti,
            &self.jwt_secret,
            self.access_token_ttl_seconds,
        )
        .map_err(|e| AuthError::Internal(e.to_string()))?;

        self.store.record_login(&address, session.issued_at)?;
        tracing::info!(address = %address, jti = %jti, "Session issued");

        Ok(session)
    }

    /// Resolve a session token to its account
    pub fn authenticate(&self, token: &str) -> Result<Account, AuthError> {
        let claims = verify_token(token, &self.jwt_secret)?;
        let address = claims.address()?;

        Ok(self.store.get(&address)?)
    }

    /// Current handshake state of an address
    pub fn state(&self, raw_address: &str) -> Result<HandshakeState, AuthError> {
        let address = Address::parse(raw_address)?;
        match self.store.get(&address) {
            Ok(account) if account.last_authenticated_at.is_some() => {
                Ok(HandshakeState::Authenticated)
            }
            Ok(_) => Ok(HandshakeState::NonceIssued),
            Err(StoreError::NotFound) => Ok(HandshakeState::Unregistered),
            Err(e) => Err(e.into()),
        }
    }

    /// Number of registered accounts
    pub fn account_count(&self) -> Result<usize, AuthError> {
        Ok(self.store.len()?)
    }

    /// Access token lifetime in seconds
    pub fn access_token_ttl_seconds(&self) -> i64 {
        self.access_token_ttl_seconds
    }
}
