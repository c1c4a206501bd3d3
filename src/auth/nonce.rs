//! Challenge nonce generation
//!
//! Nonces are 130-bit random integers drawn from the OS CSPRNG and rendered
//! in base 10. They carry no state of their own; custody lives in the
//! account record held by the user store.

use alloy_primitives::U256;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Bit width of generated nonces
pub const NONCE_BITS: usize = 130;

/// Errors that can occur while generating a nonce
#[derive(Error, Debug)]
pub enum NonceError {
    #[error("Random source failure: {0}")]
    RandomSource(String),
}

/// Single-use challenge value, decimal string form
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Nonce(String);

impl Nonce {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether a client-presented value equals this nonce
    pub fn matches(&self, presented: &str) -> bool {
        self.0 == presented
    }
}

impl From<U256> for Nonce {
    fn from(value: U256) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Largest value a nonce may take: `2^130 - 1`
pub fn nonce_upper_bound() -> U256 {
    (U256::from(1u8) << NONCE_BITS) - U256::from(1u8)
}

/// Source of fresh challenge nonces
pub trait NonceGenerator: Send + Sync {
    fn generate(&self) -> Result<Nonce, NonceError>;
}

/// Nonce generator backed by the operating system CSPRNG
#[derive(Debug, Clone, Copy, Default)]
pub struct OsNonceGenerator;

impl NonceGenerator for OsNonceGenerator {
    fn generate(&self) -> Result<Nonce, NonceError> {
        let mut bytes = [0u8; 32];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| NonceError::RandomSource(e.to_string()))?;

        // Masking a uniform 256-bit value keeps it uniform over [0, 2^130 - 1].
        let value = U256::from_be_bytes(bytes) & nonce_upper_bound();
        Ok(Nonce::from(value))
    }
}
