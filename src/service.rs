use std::path::Path;

use tokio::sync::OnceCell;

use crate::client::DropboxClient;
use crate::config::DropbookConfig;
use crate::error::DropbookError;
use crate::types::{AccountInfo, DropboxItem, SearchResult};

/// Lazily authenticated facade over the Dropbox client.
///
/// The client is built at most once per service instance: the first
/// operation triggers authentication and concurrent first calls serialize on
/// the cell, so later calls reuse the same client.
pub struct DropboxService {
    config: DropbookConfig,
    client: OnceCell<DropboxClient>,
}

impl DropboxService {
    pub fn new(config: DropbookConfig) -> Self {
        Self {
            config,
            client: OnceCell::new(),
        }
    }

    /// Build the client eagerly. File operations call this implicitly.
    pub async fn authenticate(&self) -> Result<(), DropbookError> {
        self.client().await.map(|_| ())
    }

    async fn client(&self) -> Result<&DropboxClient, DropbookError> {
        self.client
            .get_or_try_init(|| async { self.build_client() })
            .await
    }

    /// A full token quadruple enables automatic refresh; a bare access token
    /// authenticates without refresh capability.
    fn build_client(&self) -> Result<DropboxClient, DropbookError> {
        let c = &self.config;
        match (
            c.access_token.as_ref(),
            c.refresh_token.as_ref(),
            c.expiration_timestamp,
            c.uid.as_ref(),
        ) {
            (Some(access), Some(refresh), Some(expires_at), Some(_uid)) => {
                Ok(DropboxClient::with_refresh(
                    c.app_key.clone(),
                    c.app_secret.clone(),
                    access.clone(),
                    refresh.clone(),
                    expires_at,
                ))
            }
            (Some(access), _, _, _) => Ok(DropboxClient::with_access_token(access.clone())),
            _ => Err(DropbookError::NotConfigured),
        }
    }

    pub async fn list_files(&self, path: &str) -> Result<Vec<DropboxItem>, DropbookError> {
        self.client().await?.list_folder(path).await
    }

    pub async fn search(
        &self,
        query: &str,
        path: &str,
    ) -> Result<Vec<SearchResult>, DropbookError> {
        self.client().await?.search(query, path).await
    }

    pub async fn upload_file(
        &self,
        local_path: &Path,
        remote_path: &str,
        overwrite: bool,
    ) -> Result<DropboxItem, DropbookError> {
        let data = tokio::fs::read(local_path).await?;
        self.client().await?.upload(remote_path, data, overwrite).await
    }

    pub async fn download_file(
        &self,
        remote_path: &str,
        local_path: &Path,
    ) -> Result<(), DropbookError> {
        let data = self.download_data(remote_path).await?;
        tokio::fs::write(local_path, data).await?;
        Ok(())
    }

    pub async fn download_data(&self, remote_path: &str) -> Result<Vec<u8>, DropbookError> {
        self.client().await?.download(remote_path).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), DropbookError> {
        self.client().await?.delete(path).await
    }

    pub async fn account_info(&self) -> Result<AccountInfo, DropbookError> {
        self.client().await?.current_account().await
    }
}
