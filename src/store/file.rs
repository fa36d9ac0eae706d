use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::StoreError;

use super::{StoredTokenData, TokenStore};

const STORAGE_DIR: &str = ".dropbook";
const AUTH_FILE: &str = "auth.json";

/// File-backed credential record at `~/.dropbook/auth.json`.
///
/// Saves are atomic (temp file and rename in the same directory) and the
/// record is owner-read/write only from the moment it exists on disk.
pub struct FileTokenStore {
    auth_path: PathBuf,
}

impl FileTokenStore {
    pub fn new() -> Result<Self, StoreError> {
        let home = dirs::home_dir()
            .ok_or_else(|| StoreError::Backend("could not determine home directory".into()))?;
        Self::in_dir(home.join(STORAGE_DIR))
    }

    /// Use an explicit storage directory, creating it (default permissions)
    /// if absent.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            auth_path: dir.join(AUTH_FILE),
        })
    }

    pub fn path(&self) -> &Path {
        &self.auth_path
    }
}

impl TokenStore for FileTokenStore {
    fn save(&self, token: &StoredTokenData) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(token)
            .map_err(|e| StoreError::UnexpectedData(e.to_string()))?;

        // Temp-file-and-rename: a concurrent load sees either the old record
        // or the new one, never a partial write. Permissions are set at
        // creation so there is no world-readable window.
        let tmp_path = self.auth_path.with_extension("json.tmp");
        let _ = fs::remove_file(&tmp_path);

        let mut options = fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut tmp = options.open(&tmp_path)?;
        tmp.write_all(&json)?;
        tmp.sync_all()?;
        drop(tmp);

        fs::rename(&tmp_path, &self.auth_path)?;
        Ok(())
    }

    fn load(&self) -> Result<StoredTokenData, StoreError> {
        if !self.auth_path.exists() {
            return Err(StoreError::NotConfigured);
        }
        let data = fs::read_to_string(&self.auth_path)?;
        serde_json::from_str(&data).map_err(|e| StoreError::UnexpectedData(e.to_string()))
    }

    fn delete(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.auth_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn exists(&self) -> bool {
        self.auth_path.exists()
    }
}
