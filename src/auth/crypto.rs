//! Ethereum personal-message signature verification
//!
//! Recovers the secp256k1 signer of an EIP-191 `personal_sign` signature
//! and compares it against the claimed account address.

use alloy_primitives::{keccak256, Signature, B256};
use thiserror::Error;

use super::address::Address;
use super::nonce::Nonce;

/// Length of an `r || s || v` signature
const SIGNATURE_LEN: usize = 65;

/// Errors that can occur during signature recovery
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Invalid signature encoding: {0}")]
    InvalidEncoding(String),

    #[error("Signature must be 65 bytes, got {0}")]
    InvalidLength(usize),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Signer recovery failed: {0}")]
    RecoveryFailed(String),
}

/// Hash a message the way wallets do for `personal_sign`
///
/// `keccak256("\x19Ethereum Signed Message:\n" + len(message) + message)`
pub fn personal_message_hash(message: &[u8]) -> B256 {
    let prefixed = format!("\x19Ethereum Signed Message:\n{}", message.len());
    let mut prefixed_message = prefixed.into_bytes();
    prefixed_message.extend_from_slice(message);

    keccak256(&prefixed_message)
}

/// Decode a hex signature, with or without a `0x` prefix
pub fn decode_signature(signature_hex: &str) -> Result<Vec<u8>, CryptoError> {
    let trimmed = signature_hex.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);

    hex::decode(digits).map_err(|e| CryptoError::InvalidEncoding(e.to_string()))
}

/// Recover the address that produced a `personal_sign` signature over `message`
///
/// # Arguments
/// * `message` - The raw message bytes (before prefixing)
/// * `signature` - 65-byte signature (r: 32, s: 32, v: 1)
pub fn recover_personal_sign(message: &[u8], signature: &[u8]) -> Result<Address, CryptoError> {
    if signature.len() != SIGNATURE_LEN {
        return Err(CryptoError::InvalidLength(signature.len()));
    }

    // Only bare parity (0/1) or legacy Ethereum (27/28) recovery bytes;
    // EIP-155 chain-encoded values are refused.
    let v = signature[SIGNATURE_LEN - 1];
    if !matches!(v, 0 | 1 | 27 | 28) {
        return Err(CryptoError::InvalidSignature(format!(
            "unsupported recovery byte {v}"
        )));
    }

    let sig = Signature::try_from(signature)
        .map_err(|e| CryptoError::InvalidSignature(e.to_string()))?;

    let hash = personal_message_hash(message);
    let recovered = sig
        .recover_address_from_prehash(&hash)
        .map_err(|e| CryptoError::RecoveryFailed(e.to_string()))?;

    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(recovered.as_slice());
    Ok(Address::from_bytes(&bytes))
}

/// Verify that `signature_hex` is `address`'s signature over `nonce`
///
/// Malformed signatures are a verification failure, never an error.
pub fn verify_nonce_signature(address: &Address, nonce: &Nonce, signature_hex: &str) -> bool {
    let recovered = decode_signature(signature_hex)
        .and_then(|sig| recover_personal_sign(nonce.as_str().as_bytes(), &sig));

    match recovered {
        Ok(signer) => signer == *address,
        Err(e) => {
            tracing::debug!(address = %address, error = %e, "Signature rejected");
            false
        }
    }
}
