//! Account storage
//!
//! The store exclusively owns every account record, including the account's
//! live challenge nonce, so that registration and nonce consumption share a
//! single lock domain.

mod memory;

pub use memory::MemoryUserStore;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::auth::{Address, Nonce, NonceError};

/// Store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Account already exists")]
    AlreadyExists,

    #[error("Account not found")]
    NotFound,

    #[error("Nonce does not match the current challenge")]
    NonceMismatch,

    #[error("Storage failure: {0}")]
    Internal(String),
}

impl From<NonceError> for StoreError {
    fn from(e: NonceError) -> Self {
        StoreError::Internal(e.to_string())
    }
}

/// Registered account and its current challenge state
#[derive(Debug, Clone, Serialize)]
pub struct Account {
    pub address: Address,
    pub current_nonce: Nonce,
    pub nonce_issued_at: DateTime<Utc>,
    /// Set when the nonce was consumed but no replacement could be drawn
    pub nonce_consumed: bool,
    pub registered_at: DateTime<Utc>,
    pub last_authenticated_at: Option<DateTime<Utc>>,
}

impl Account {
    pub fn new(address: Address, nonce: Nonce, now: DateTime<Utc>) -> Self {
        Self {
            address,
            current_nonce: nonce,
            nonce_issued_at: now,
            nonce_consumed: false,
            registered_at: now,
            last_authenticated_at: None,
        }
    }
}

/// Concurrency-safe registry of accounts keyed by canonical address
///
/// Every method is atomic with respect to the address it touches.
pub trait UserStore: Send + Sync {
    /// Insert a new account; exactly one of several concurrent callers wins
    fn create_if_absent(&self, address: &Address, initial_nonce: Nonce)
        -> Result<Account, StoreError>;

    fn get(&self, address: &Address) -> Result<Account, StoreError>;

    /// Return the account with a usable nonce, replacing a consumed or
    /// expired one first
    fn issue_challenge(&self, address: &Address) -> Result<Account, StoreError>;

    /// Check `presented` against the live nonce and, if it matches, rotate it.
    ///
    /// Returns the account as it was before rotation. Consumption is final:
    /// if no replacement nonce can be drawn the old one is still invalidated.
    fn consume_and_rotate(&self, address: &Address, presented: &str)
        -> Result<Account, StoreError>;

    fn record_login(&self, address: &Address, at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Number of registered accounts
    fn len(&self) -> Result<usize, StoreError>;
}
