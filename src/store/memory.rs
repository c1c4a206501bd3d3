//! In-memory account store

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use super::{Account, StoreError, UserStore};
use crate::auth::{Address, Nonce, NonceGenerator};

/// Account store backed by a lock-guarded map
///
/// The map lock only guards membership. Each account sits behind its own
/// mutex, and accounts are never removed, so nonce operations on different
/// addresses do not contend with each other.
pub struct MemoryUserStore {
    accounts: RwLock<HashMap<Address, Arc<Mutex<Account>>>>,
    nonces: Arc<dyn NonceGenerator>,
    nonce_ttl: Option<Duration>,
}

impl MemoryUserStore {
    /// Create an empty store
    ///
    /// `nonce_ttl` of `None` keeps nonces valid until they are consumed.
    pub fn new(nonces: Arc<dyn NonceGenerator>, nonce_ttl: Option<Duration>) -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            nonces,
            nonce_ttl,
        }
    }

    fn account(&self, address: &Address) -> Result<Arc<Mutex<Account>>, StoreError> {
        let accounts = self
            .accounts
            .read()
            .map_err(|_| StoreError::Internal("account map lock poisoned".to_string()))?;

        accounts.get(address).cloned().ok_or(StoreError::NotFound)
    }

    fn with_account<T>(
        &self,
        address: &Address,
        f: impl FnOnce(&mut Account) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let entry = self.account(address)?;
        let mut account = entry
            .lock()
            .map_err(|_| StoreError::Internal("account lock poisoned".to_string()))?;
        f(&mut account)
    }

    fn is_expired(&self, account: &Account, now: DateTime<Utc>) -> bool {
        self.nonce_ttl
            .map_or(false, |ttl| now - account.nonce_issued_at >= ttl)
    }
}

impl UserStore for MemoryUserStore {
    fn create_if_absent(
        &self,
        address: &Address,
        initial_nonce: Nonce,
    ) -> Result<Account, StoreError> {
        let mut accounts = self
            .accounts
            .write()
            .map_err(|_| StoreError::Internal("account map lock poisoned".to_string()))?;

        if accounts.contains_key(address) {
            return Err(StoreError::AlreadyExists);
        }

        let account = Account::new(address.clone(), initial_nonce, Utc::now());
        accounts.insert(address.clone(), Arc::new(Mutex::new(account.clone())));
        Ok(account)
    }

    fn get(&self, address: &Address) -> Result<Account, StoreError> {
        self.with_account(address, |account| Ok(account.clone()))
    }

    fn issue_challenge(&self, address: &Address) -> Result<Account, StoreError> {
        self.with_account(address, |account| {
            let now = Utc::now();
            if account.nonce_consumed || self.is_expired(account, now) {
                account.current_nonce = self.nonces.generate()?;
                account.nonce_issued_at = now;
                account.nonce_consumed = false;
                tracing::debug!(address = %address, "Challenge nonce reissued");
            }
            Ok(account.clone())
        })
    }

    fn consume_and_rotate(&self, address: &Address, presented: &str) -> Result<Account, StoreError> {
        self.with_account(address, |account| {
            let now = Utc::now();
            if account.nonce_consumed
                || !account.current_nonce.matches(presented)
                || self.is_expired(account, now)
            {
                return Err(StoreError::NonceMismatch);
            }

            let before = account.clone();
            match self.nonces.generate() {
                Ok(next) => {
                    account.current_nonce = next;
                    account.nonce_issued_at = now;
                }
                Err(e) => {
                    tracing::warn!(
                        address = %address,
                        error = %e,
                        "Nonce rotation failed, marking challenge consumed"
                    );
                    account.nonce_consumed = true;
                }
            }
            Ok(before)
        })
    }

    fn record_login(&self, address: &Address, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.with_account(address, |account| {
            account.last_authenticated_at = Some(at);
            Ok(())
        })
    }

    fn len(&self) -> Result<usize, StoreError> {
        let accounts = self
            .accounts
            .read()
            .map_err(|_| StoreError::Internal("account map lock poisoned".to_string()))?;
        Ok(accounts.len())
    }
}
