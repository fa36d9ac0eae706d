use thiserror::Error;

/// Top-level error type for dropbook.
#[derive(Debug, Error)]
pub enum DropbookError {
    #[error("Dropbox app credentials not configured. Set DROPBOX_APP_KEY and DROPBOX_APP_SECRET, then run 'dropbook login'.")]
    NotConfigured,

    #[error("Authentication failed. Please check your credentials.")]
    AuthenticationFailed,

    #[error(transparent)]
    OAuth(#[from] OAuthError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Dropbox API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Missing argument: {0}")]
    MissingArgument(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors from the OAuth authorization and token-exchange flow.
#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("Invalid response from OAuth server")]
    InvalidResponse,

    #[error("OAuth request failed with status {0}")]
    Http(u16),

    #[error("{}", format_server_error(.error, .description))]
    Server {
        error: String,
        description: Option<String>,
    },

    #[error("Invalid state parameter - possible CSRF attack")]
    InvalidState,

    #[error("Could not obtain entropy from the OS random source: {0}")]
    Entropy(String),
}

fn format_server_error(error: &str, description: &Option<String>) -> String {
    match description {
        Some(desc) => format!("OAuth error: {error} - {desc}"),
        None => format!("OAuth error: {error}"),
    }
}

/// Errors from the credential store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("No credentials found in the secure vault. Run 'dropbook login' first.")]
    ItemNotFound,

    #[error("No stored credentials found. Run 'dropbook login' first.")]
    NotConfigured,

    #[error("Unexpected data in credential store: {0}")]
    UnexpectedData(String),

    #[error("Secure vault not available: {0}")]
    VaultUnavailable(String),

    #[error("Credential store backend error: {0}")]
    Backend(String),

    #[error("Credential store I/O error: {0}")]
    Io(#[from] std::io::Error),
}
