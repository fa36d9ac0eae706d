use serde::Deserialize;

use crate::error::OAuthError;

pub const TOKEN_ENDPOINT: &str = "https://api.dropboxapi.com/oauth2/token";

/// Applied when the token response omits `expires_in`. Dropbox issues
/// 4-hour access tokens; this exact value is deliberate policy, not a guess,
/// and refresh scheduling downstream depends on it.
pub const DEFAULT_EXPIRES_IN_SECS: i64 = 14_400;

/// Result of a successful token exchange or refresh.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub access_token: String,
    pub uid: String,
    pub refresh_token: Option<String>,
    /// Unix timestamp (seconds) after which the access token is stale.
    pub expires_at: f64,
}

/// Raw success body from the token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[allow(dead_code)]
    token_type: String,
    expires_in: Option<i64>,
    refresh_token: Option<String>,
    uid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OAuthErrorResponse {
    error: String,
    error_description: Option<String>,
}

/// Exchange an authorization code for an access/refresh token pair.
///
/// POSTs form-encoded `code`, `grant_type=authorization_code` and
/// `code_verifier` with HTTP Basic app credentials. Never retried here;
/// retry policy, if any, belongs to the caller.
pub async fn exchange_code(
    endpoint: &str,
    app_key: &str,
    app_secret: &str,
    code: &str,
    code_verifier: &str,
) -> Result<AccessToken, OAuthError> {
    request_token(
        endpoint,
        app_key,
        app_secret,
        &[
            ("code", code),
            ("grant_type", "authorization_code"),
            ("code_verifier", code_verifier),
        ],
        None,
    )
    .await
}

/// Obtain a fresh access token from a long-lived refresh token.
///
/// Dropbox does not rotate refresh tokens, so the prior one is carried into
/// the returned record.
pub async fn refresh_access_token(
    endpoint: &str,
    app_key: &str,
    app_secret: &str,
    refresh_token: &str,
) -> Result<AccessToken, OAuthError> {
    request_token(
        endpoint,
        app_key,
        app_secret,
        &[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ],
        Some(refresh_token),
    )
    .await
}

async fn request_token(
    endpoint: &str,
    app_key: &str,
    app_secret: &str,
    form: &[(&str, &str)],
    prior_refresh_token: Option<&str>,
) -> Result<AccessToken, OAuthError> {
    let client = reqwest::Client::new();
    let resp = client
        .post(endpoint)
        .basic_auth(app_key, Some(app_secret))
        .form(form)
        .send()
        .await
        .map_err(|e| {
            tracing::debug!("token request transport failure: {e}");
            OAuthError::InvalidResponse
        })?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        if let Ok(err) = serde_json::from_str::<OAuthErrorResponse>(&body) {
            return Err(OAuthError::Server {
                error: err.error,
                description: err.error_description,
            });
        }
        return Err(OAuthError::Http(status.as_u16()));
    }

    let token: TokenResponse = resp.json().await.map_err(|_| OAuthError::InvalidResponse)?;

    let expires_in = token.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
    let expires_at = chrono::Utc::now().timestamp() as f64 + expires_in as f64;

    Ok(AccessToken {
        access_token: token.access_token,
        uid: token.uid.unwrap_or_default(),
        refresh_token: token
            .refresh_token
            .or_else(|| prior_refresh_token.map(str::to_string)),
        expires_at,
    })
}
