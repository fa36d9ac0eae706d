use keyring::Entry;

use crate::error::StoreError;

use super::{StoredTokenData, TokenStore};

// Fixed service/account pair for the single-user credential record.
const VAULT_SERVICE: &str = "com.dropbook.oauth";
const VAULT_ACCOUNT: &str = "dropbox-tokens";

/// OS credential vault backend: Keychain on macOS, Secret Service on Linux,
/// Credential Manager on Windows. The stored value is the same JSON record
/// the file backend writes.
pub struct VaultTokenStore {
    service: String,
    account: String,
}

impl VaultTokenStore {
    /// Returns an error when the platform exposes no usable vault (for
    /// example headless Linux without a Secret Service daemon).
    pub fn try_new() -> Result<Self, StoreError> {
        Self::with_keys(VAULT_SERVICE, VAULT_ACCOUNT)
    }

    /// Custom service/account keys, used by tests to keep clear of the real
    /// record.
    pub fn with_keys(service: &str, account: &str) -> Result<Self, StoreError> {
        Entry::new(service, account).map_err(|e| StoreError::VaultUnavailable(e.to_string()))?;
        Ok(Self {
            service: service.to_string(),
            account: account.to_string(),
        })
    }

    fn entry(&self) -> Result<Entry, StoreError> {
        Entry::new(&self.service, &self.account).map_err(|e| StoreError::Backend(e.to_string()))
    }
}

impl TokenStore for VaultTokenStore {
    fn save(&self, token: &StoredTokenData) -> Result<(), StoreError> {
        let json =
            serde_json::to_string(token).map_err(|e| StoreError::UnexpectedData(e.to_string()))?;
        // Delete-then-insert keeps exactly one entry under the fixed key.
        self.delete()?;
        self.entry()?
            .set_password(&json)
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    fn load(&self) -> Result<StoredTokenData, StoreError> {
        match self.entry()?.get_password() {
            Ok(json) => serde_json::from_str(&json)
                .map_err(|e| StoreError::UnexpectedData(e.to_string())),
            Err(keyring::Error::NoEntry) => Err(StoreError::ItemNotFound),
            Err(e) => Err(StoreError::Backend(e.to_string())),
        }
    }

    fn delete(&self) -> Result<(), StoreError> {
        match self.entry()?.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(StoreError::Backend(e.to_string())),
        }
    }

    fn exists(&self) -> bool {
        self.entry().map(|e| e.get_password().is_ok()).unwrap_or(false)
    }
}
