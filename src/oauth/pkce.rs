use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::TryRngCore;
use sha2::{Digest, Sha256};

use crate::error::OAuthError;

/// PKCE verifier/challenge pair for one login attempt (RFC 7636).
pub struct PkceMaterial {
    pub code_verifier: String,
    pub code_challenge: String,
}

// 32 random bytes encode to exactly 43 base64url characters, the minimum
// verifier length RFC 7636 allows.
const VERIFIER_BYTES: usize = 32;
const STATE_BYTES: usize = 16;

pub fn generate_pkce() -> Result<PkceMaterial, OAuthError> {
    let code_verifier = generate_verifier()?;
    let code_challenge = challenge(&code_verifier);
    Ok(PkceMaterial {
        code_verifier,
        code_challenge,
    })
}

pub fn generate_verifier() -> Result<String, OAuthError> {
    random_urlsafe(VERIFIER_BYTES)
}

/// S256 code challenge: base64url(SHA-256(verifier)) without padding.
pub fn challenge(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Anti-CSRF state token, one per login attempt.
pub fn generate_state() -> Result<String, OAuthError> {
    random_urlsafe(STATE_BYTES)
}

/// Fill from the OS CSPRNG. An entropy failure aborts the login attempt;
/// there is no weaker fallback source.
fn random_urlsafe(byte_count: usize) -> Result<String, OAuthError> {
    let mut buf = vec![0u8; byte_count];
    OsRng
        .try_fill_bytes(&mut buf)
        .map_err(|e| OAuthError::Entropy(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(&buf))
}
