//! Authentication module
//!
//! Provides wallet-based authentication for Ethereum accounts.
//! - Address validation and canonicalization
//! - Single-use challenge nonces
//! - `personal_sign` signature recovery
//! - JWT session issuance

mod address;
mod crypto;
mod jwt;
mod nonce;
mod service;

pub use address::{Address, AddressError};
pub use crypto::{
    decode_signature, personal_message_hash, recover_personal_sign, verify_nonce_signature,
    CryptoError,
};
pub use jwt::{generate_access_token, verify_token, Claims, JwtError, Session, TokenType};
pub use nonce::{
    nonce_upper_bound, Nonce, NonceError, NonceGenerator, OsNonceGenerator, NONCE_BITS,
};
pub use service::{AuthError, AuthService, HandshakeState};
