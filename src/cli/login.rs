use std::io::{self, BufRead, Write};

use colored::Colorize;

use crate::config::{ENV_APP_KEY, ENV_APP_SECRET};
use crate::error::DropbookError;
use crate::oauth::authorize::{build_authorize_url, parse_redirect, verify_state, RedirectInput, DEFAULT_SCOPES};
use crate::oauth::pkce::{generate_pkce, generate_state};
use crate::oauth::token::{exchange_code, TOKEN_ENDPOINT};
use crate::store::{CredentialStore, StoredTokenData};

/// Interactive OAuth 2.0 Authorization Code + PKCE login.
///
/// Dropbox redirects to a custom `db-<appkey>://` scheme we never receive,
/// so the operator pastes the redirect back and the state parameter is
/// verified here before the code is exchanged.
pub async fn run_login() -> Result<(), DropbookError> {
    let app_key = std::env::var(ENV_APP_KEY).map_err(|_| DropbookError::NotConfigured)?;
    let app_secret = std::env::var(ENV_APP_SECRET).map_err(|_| DropbookError::NotConfigured)?;

    let pkce = generate_pkce()?;
    let state = generate_state()?;
    let auth_url = build_authorize_url(&app_key, &pkce.code_challenge, &state, DEFAULT_SCOPES);

    println!("{}", "Dropbook OAuth login".bold());
    println!();
    println!("Step 1: authorize dropbook in your browser:");
    println!("\n{auth_url}\n");
    if webbrowser::open(&auth_url).is_err() {
        tracing::debug!("could not open a browser; the URL is printed above");
    }
    println!("Step 2: after authorizing you will be redirected to a URL like:");
    println!("  db-{app_key}://2/token?code=AUTHORIZATION_CODE&state={state}");
    println!();
    println!("Step 3: paste the full redirect URL (or just the authorization code):");
    print!("> ");
    io::stdout().flush()?;

    let stdin = io::stdin();
    let mut line = String::new();
    stdin.lock().read_line(&mut line)?;

    let (code, returned_state) = match parse_redirect(&line) {
        RedirectInput::Redirect { code, state } => (code, state),
        RedirectInput::BareCode(code) => {
            print!("State parameter from the redirect: ");
            io::stdout().flush()?;
            let mut state_line = String::new();
            stdin.lock().read_line(&mut state_line)?;
            (code, state_line.trim().to_string())
        }
    };

    // A state mismatch means the code cannot be trusted; bail before ever
    // talking to the token endpoint.
    verify_state(&state, &returned_state)?;

    if code.is_empty() {
        return Err(DropbookError::AuthenticationFailed);
    }

    println!("\nExchanging authorization code for access token...");
    let token = exchange_code(
        TOKEN_ENDPOINT,
        &app_key,
        &app_secret,
        &code,
        &pkce.code_verifier,
    )
    .await?;

    let store = CredentialStore::open()?;
    store.save(&StoredTokenData::from(&token))?;

    println!("{}", "Authenticated.".green());
    if store.vault().is_some() {
        println!("Credentials saved to the system vault.");
        println!("Backup written to {}", store.file().path().display());
    } else {
        println!("Credentials written to {}", store.file().path().display());
    }
    println!("You can now run dropbook commands without DROPBOX_ACCESS_TOKEN set.");
    Ok(())
}
