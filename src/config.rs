use crate::error::DropbookError;
use crate::store::CredentialStore;

pub const ENV_APP_KEY: &str = "DROPBOX_APP_KEY";
pub const ENV_APP_SECRET: &str = "DROPBOX_APP_SECRET";
pub const ENV_ACCESS_TOKEN: &str = "DROPBOX_ACCESS_TOKEN";
pub const ENV_REFRESH_TOKEN: &str = "DROPBOX_REFRESH_TOKEN";

/// Effective runtime configuration. App-level credentials always come from
/// the environment and are never persisted; user-level token fields come from
/// the credential store or from environment overrides.
#[derive(Debug, Clone)]
pub struct DropbookConfig {
    pub app_key: String,
    pub app_secret: String,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expiration_timestamp: Option<f64>,
    pub uid: Option<String>,
}

impl DropbookConfig {
    /// User token fields straight from environment variables, no storage
    /// access. This is the fallback when storage itself is unusable.
    pub fn from_environment() -> Result<Self, DropbookError> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// User token fields from the tiered credential store. Environment token
    /// variables are ignored on this path; only the app key/secret are read
    /// from the environment.
    pub fn from_storage() -> Result<Self, DropbookError> {
        let store = CredentialStore::open()?;
        Self::from_store_with(&store, |key| std::env::var(key).ok())
    }

    /// Stored credentials first; on any storage failure fall back to the raw
    /// environment. Defined precedence, not a race.
    pub fn load() -> Result<Self, DropbookError> {
        match Self::from_storage() {
            Ok(config) => Ok(config),
            Err(e) => {
                tracing::debug!("stored credentials unavailable ({e}), falling back to environment");
                Self::from_environment()
            }
        }
    }

    fn from_env_with(env: impl Fn(&str) -> Option<String>) -> Result<Self, DropbookError> {
        let (app_key, app_secret) = app_credentials(&env)?;
        Ok(Self {
            app_key,
            app_secret,
            access_token: env(ENV_ACCESS_TOKEN),
            refresh_token: env(ENV_REFRESH_TOKEN),
            expiration_timestamp: None,
            uid: None,
        })
    }

    fn from_store_with(
        store: &CredentialStore,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, DropbookError> {
        let (app_key, app_secret) = app_credentials(&env)?;
        let token = store.load()?;
        Ok(Self {
            app_key,
            app_secret,
            access_token: Some(token.access_token),
            refresh_token: token.refresh_token,
            expiration_timestamp: token.expiration_timestamp,
            uid: token.uid,
        })
    }
}

fn app_credentials(
    env: &impl Fn(&str) -> Option<String>,
) -> Result<(String, String), DropbookError> {
    let app_key = env(ENV_APP_KEY)
        .filter(|v| !v.is_empty())
        .ok_or(DropbookError::NotConfigured)?;
    let app_secret = env(ENV_APP_SECRET)
        .filter(|v| !v.is_empty())
        .ok_or(DropbookError::NotConfigured)?;
    Ok((app_key, app_secret))
}
