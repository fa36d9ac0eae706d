use clap::{Parser, Subcommand};

use dropbook::{DropbookConfig, DropbookError, DropboxService};

#[derive(Parser)]
#[command(name = "dropbook", version, about = "Dropbox file access from the terminal and over MCP")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Authorize dropbook with your Dropbox account
    Login,

    /// Remove stored Dropbox credentials
    Logout,

    /// List files and folders
    List {
        /// Dropbox path to list (defaults to the root)
        path: Option<String>,
    },

    /// Search for files
    Search {
        /// Search query
        query: String,

        /// Restrict the search to this folder
        #[arg(long)]
        path: Option<String>,
    },

    /// Upload a local file to Dropbox
    Upload {
        /// Local file to upload
        local: String,

        /// Destination Dropbox path
        remote: String,

        /// Replace an existing file instead of failing
        #[arg(long)]
        overwrite: bool,
    },

    /// Download a Dropbox file
    Download {
        /// Dropbox file to download
        remote: String,

        /// Local destination path
        local: String,
    },

    /// Delete a file or folder
    Delete {
        /// Dropbox path to delete
        path: String,
    },

    /// Show the linked Dropbox account
    Account,

    /// Run the MCP stdio server
    Mcp,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("DROPBOOK_LOG_LEVEL")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn authenticated_service() -> Result<DropboxService, DropbookError> {
    Ok(DropboxService::new(DropbookConfig::load()?))
}

async fn run(cli: Cli) -> Result<(), DropbookError> {
    match cli.command {
        Commands::Login => dropbook::cli::login::run_login().await,
        Commands::Logout => dropbook::cli::logout::run_logout(),
        Commands::List { path } => {
            let service = authenticated_service()?;
            dropbook::cli::files::run_list(&service, path.as_deref().unwrap_or("")).await
        }
        Commands::Search { query, path } => {
            let service = authenticated_service()?;
            dropbook::cli::files::run_search(&service, &query, path.as_deref().unwrap_or(""))
                .await
        }
        Commands::Upload {
            local,
            remote,
            overwrite,
        } => {
            let service = authenticated_service()?;
            dropbook::cli::files::run_upload(&service, &local, &remote, overwrite).await
        }
        Commands::Download { remote, local } => {
            let service = authenticated_service()?;
            dropbook::cli::files::run_download(&service, &remote, &local).await
        }
        Commands::Delete { path } => {
            let service = authenticated_service()?;
            dropbook::cli::files::run_delete(&service, &path).await
        }
        Commands::Account => {
            let service = authenticated_service()?;
            dropbook::cli::files::run_account(&service).await
        }
        Commands::Mcp => {
            let service = authenticated_service()?;
            dropbook::mcp::McpServer::new(service).serve().await
        }
    }
}
