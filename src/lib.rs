//! Dropbook: Dropbox access for the terminal and for agents.
//!
//! Authenticates with OAuth 2.0 Authorization Code + PKCE, stores tokens in
//! the system vault with a file backup, and exposes file operations through
//! both a CLI and an MCP stdio server.

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod mcp;
pub mod oauth;
pub mod service;
pub mod store;
pub mod types;

pub use config::DropbookConfig;
pub use error::{DropbookError, OAuthError, StoreError};
pub use service::DropboxService;
