use crate::error::OAuthError;

pub const AUTHORIZE_ENDPOINT: &str = "https://www.dropbox.com/oauth2/authorize";

/// Scopes requested on login.
pub const DEFAULT_SCOPES: &[&str] = &[
    "account_info.read",
    "files.metadata.read",
    "files.metadata.write",
    "files.content.read",
    "files.content.write",
];

/// Build the browser-facing authorization URL. Pure; no network access.
///
/// `token_access_type=offline` asks Dropbox for a refresh token alongside the
/// short-lived access token.
pub fn build_authorize_url(
    app_key: &str,
    code_challenge: &str,
    state: &str,
    scopes: &[&str],
) -> String {
    let mut url = format!(
        "{AUTHORIZE_ENDPOINT}?client_id={}&response_type=code&code_challenge={}&code_challenge_method=S256&token_access_type=offline&state={}",
        urlencode(app_key),
        urlencode(code_challenge),
        urlencode(state),
    );
    if !scopes.is_empty() {
        url.push_str("&scope=");
        url.push_str(&urlencode(&scopes.join(" ")));
    }
    url
}

/// What the operator pasted back after authorizing: either the full redirect
/// URL (carrying both code and state) or a bare authorization code.
#[derive(Debug, PartialEq, Eq)]
pub enum RedirectInput {
    Redirect { code: String, state: String },
    BareCode(String),
}

/// Parse the operator's pasted input. Anything with a query string is treated
/// as a redirect URL; missing parameters come back empty so the caller's
/// state check fails closed.
pub fn parse_redirect(input: &str) -> RedirectInput {
    let trimmed = input.trim();
    if let Some(query) = trimmed.split('?').nth(1) {
        let mut code = String::new();
        let mut state = String::new();
        for param in query.split('&') {
            if let Some(value) = param.strip_prefix("code=") {
                code = urldecode(value);
            } else if let Some(value) = param.strip_prefix("state=") {
                state = urldecode(value);
            }
        }
        return RedirectInput::Redirect { code, state };
    }
    RedirectInput::BareCode(trimmed.to_string())
}

/// Verbatim comparison of the generated state against the redirect's state.
/// A mismatch is a hard failure; the authorization code must not be used.
pub fn verify_state(expected: &str, received: &str) -> Result<(), OAuthError> {
    if expected == received {
        Ok(())
    } else {
        Err(OAuthError::InvalidState)
    }
}

fn urlencode(s: &str) -> String {
    let mut result = String::with_capacity(s.len() * 2);
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(b as char);
            }
            _ => {
                result.push('%');
                result.push_str(&format!("{b:02X}"));
            }
        }
    }
    result
}

fn urldecode(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut bytes = s.bytes();
    while let Some(b) = bytes.next() {
        if b == b'%' {
            let hi = bytes.next();
            let lo = bytes.next();
            if let (Some(h), Some(l)) = (hi, lo) {
                let hex = [h, l];
                if let Ok(pair) = std::str::from_utf8(&hex) {
                    if let Ok(val) = u8::from_str_radix(pair, 16) {
                        result.push(val as char);
                        continue;
                    }
                }
            }
            result.push('%');
        } else if b == b'+' {
            result.push(' ');
        } else {
            result.push(b as char);
        }
    }
    result
}
