pub mod authorize;
pub mod pkce;
pub mod token;

pub use authorize::{build_authorize_url, parse_redirect, verify_state, RedirectInput};
pub use pkce::{challenge, generate_pkce, generate_state, PkceMaterial};
pub use token::{exchange_code, refresh_access_token, AccessToken};
