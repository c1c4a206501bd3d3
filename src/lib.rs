//! Ethereum wallet nonce authentication
//!
//! Challenge-response login for Ethereum addresses: a registered address is
//! handed a one-time random nonce, signs it with `personal_sign`, and trades
//! the signature for a session token.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod store;
