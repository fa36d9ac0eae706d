use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use dropbook::error::OAuthError;
use dropbook::oauth::token::{exchange_code, refresh_access_token, DEFAULT_EXPIRES_IN_SECS};

// Basic auth for key:secret.
const BASIC_KEY_SECRET: &str = "Basic a2V5OnNlY3JldA==";

#[tokio::test]
async fn exchange_success_full_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(header("authorization", BASIC_KEY_SECRET))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=authcode"))
        .and(body_string_contains("code_verifier=verif"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "tok123",
            "token_type": "bearer",
            "expires_in": 14400,
            "refresh_token": "ref456",
            "uid": "u1"
        })))
        .mount(&server)
        .await;

    let endpoint = format!("{}/oauth2/token", server.uri());
    let token = exchange_code(&endpoint, "key", "secret", "authcode", "verif")
        .await
        .unwrap();

    assert_eq!(token.access_token, "tok123");
    assert_eq!(token.refresh_token.as_deref(), Some("ref456"));
    assert_eq!(token.uid, "u1");

    let expected = chrono::Utc::now().timestamp() as f64 + 14400.0;
    assert!((token.expires_at - expected).abs() < 5.0);
}

#[tokio::test]
async fn exchange_applies_default_expiry_when_omitted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "tok123",
            "token_type": "bearer",
            "uid": "u1"
        })))
        .mount(&server)
        .await;

    let token = exchange_code(&server.uri(), "key", "secret", "authcode", "verif")
        .await
        .unwrap();

    assert!(token.refresh_token.is_none());
    let expected = chrono::Utc::now().timestamp() as f64 + DEFAULT_EXPIRES_IN_SECS as f64;
    assert!((token.expires_at - expected).abs() < 5.0);
}

#[tokio::test]
async fn exchange_surfaces_structured_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_grant",
            "error_description": "code expired"
        })))
        .mount(&server)
        .await;

    let err = exchange_code(&server.uri(), "key", "secret", "stale", "verif")
        .await
        .unwrap_err();

    match err {
        OAuthError::Server { error, description } => {
            assert_eq!(error, "invalid_grant");
            assert_eq!(description.as_deref(), Some("code expired"));
        }
        other => panic!("expected server error, got {other:?}"),
    }
}

#[tokio::test]
async fn exchange_maps_unparseable_error_to_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&server)
        .await;

    let err = exchange_code(&server.uri(), "key", "secret", "authcode", "verif")
        .await
        .unwrap_err();
    assert!(matches!(err, OAuthError::Http(500)));
}

#[tokio::test]
async fn refresh_keeps_prior_refresh_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=ref456"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "tok999",
            "token_type": "bearer",
            "expires_in": 14400
        })))
        .mount(&server)
        .await;

    let token = refresh_access_token(&server.uri(), "key", "secret", "ref456")
        .await
        .unwrap();

    assert_eq!(token.access_token, "tok999");
    assert_eq!(token.refresh_token.as_deref(), Some("ref456"));
}
