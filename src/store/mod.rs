mod file;
mod vault;

pub use file::FileTokenStore;
pub use vault::VaultTokenStore;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::oauth::token::AccessToken;

/// Persisted projection of an [`AccessToken`]. The camelCase keys are the
/// `~/.dropbook/auth.json` wire format; both backends store this exact shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredTokenData {
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_timestamp: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
}

impl From<&AccessToken> for StoredTokenData {
    fn from(token: &AccessToken) -> Self {
        Self {
            access_token: token.access_token.clone(),
            refresh_token: token.refresh_token.clone(),
            expiration_timestamp: Some(token.expires_at),
            uid: Some(token.uid.clone()),
        }
    }
}

/// Contract shared by both credential backends.
pub trait TokenStore {
    fn save(&self, token: &StoredTokenData) -> Result<(), StoreError>;
    fn load(&self) -> Result<StoredTokenData, StoreError>;
    /// Removing an absent record is not an error.
    fn delete(&self) -> Result<(), StoreError>;
    fn exists(&self) -> bool;
}

/// Tiered credential store: OS vault as primary where the platform has one,
/// file backend always present as backup.
pub struct CredentialStore {
    vault: Option<VaultTokenStore>,
    file: FileTokenStore,
}

impl CredentialStore {
    pub fn open() -> Result<Self, StoreError> {
        let vault = match VaultTokenStore::try_new() {
            Ok(vault) => Some(vault),
            Err(e) => {
                tracing::debug!("secure vault unavailable: {e}");
                None
            }
        };
        Ok(Self {
            vault,
            file: FileTokenStore::new()?,
        })
    }

    /// Compose from explicit backends. Used by tests and callers that manage
    /// their own storage locations.
    pub fn with_backends(vault: Option<VaultTokenStore>, file: FileTokenStore) -> Self {
        Self { vault, file }
    }

    pub fn vault(&self) -> Option<&VaultTokenStore> {
        self.vault.as_ref()
    }

    pub fn file(&self) -> &FileTokenStore {
        &self.file
    }

    /// Write to both backends. A vault failure downgrades to a warning so
    /// login still completes on headless systems; a file failure is fatal
    /// because the backup record must always land.
    pub fn save(&self, token: &StoredTokenData) -> Result<(), StoreError> {
        if let Some(vault) = &self.vault {
            if let Err(e) = vault.save(token) {
                tracing::warn!("could not save credentials to the secure vault: {e}");
            }
        }
        self.file.save(token)
    }

    /// Vault first; the file backend is consulted only when the vault is
    /// absent on this platform or has no usable entry. Results are never
    /// merged across backends.
    pub fn load(&self) -> Result<StoredTokenData, StoreError> {
        if let Some(vault) = &self.vault {
            match vault.load() {
                Ok(token) => return Ok(token),
                Err(StoreError::ItemNotFound) => {}
                Err(e) => tracing::debug!("vault load failed, trying file backend: {e}"),
            }
        }
        self.file.load()
    }

    /// Clear both backends. The file record is always removed even when the
    /// vault delete fails; the first failure is still reported.
    pub fn delete(&self) -> Result<(), StoreError> {
        let vault_result = match &self.vault {
            Some(vault) => vault.delete(),
            None => Ok(()),
        };
        self.file.delete()?;
        vault_result
    }

    pub fn exists(&self) -> bool {
        self.vault.as_ref().is_some_and(|v| v.exists()) || self.file.exists()
    }
}
