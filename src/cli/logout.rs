use crate::error::DropbookError;
use crate::store::{CredentialStore, TokenStore};

/// Clear stored credentials from both backends. Running logout with nothing
/// stored is not an error.
pub fn run_logout() -> Result<(), DropbookError> {
    let store = CredentialStore::open()?;
    let mut cleared = false;

    if let Some(vault) = store.vault() {
        if vault.exists() {
            match vault.delete() {
                Ok(()) => {
                    println!("Cleared credentials from the system vault");
                    cleared = true;
                }
                Err(e) => eprintln!("Warning: could not clear the system vault: {e}"),
            }
        }
    }

    if store.file().exists() {
        store.file().delete()?;
        println!("Cleared {}", store.file().path().display());
        cleared = true;
    }

    if cleared {
        println!("Logged out.");
    } else {
        println!("No stored credentials found.");
    }
    Ok(())
}
