//! Service account token exchange tests against a mock OAuth2 endpoint

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use voice_relay_gateway::config::ServerConfig;
use voice_relay_gateway::core::auth::{
    AuthError, Credential, CredentialProvider, ServiceAccountExchange, ServiceAccountKey,
    SystemClock, TokenExchange,
};

const TEST_PRIVATE_KEY: &str = include_str!("fixtures/service_account_key.pem");

fn service_account_json() -> String {
    json!({
        "type": "service_account",
        "client_email": "relay@test-project.iam.gserviceaccount.com",
        "private_key": TEST_PRIVATE_KEY,
        "token_uri": "https://oauth2.googleapis.com/token",
    })
    .to_string()
}

fn exchange_for(server: &MockServer) -> ServiceAccountExchange {
    let key = ServiceAccountKey::from_json(&service_account_json()).unwrap();
    ServiceAccountExchange::new(
        key,
        "https://www.googleapis.com/auth/generative-language",
        format!("{}/token", server.uri()),
    )
    .unwrap()
}

fn provider_for(server: &MockServer) -> CredentialProvider {
    CredentialProvider::with_exchange(Arc::new(exchange_for(server)), Arc::new(SystemClock))
}

fn token_endpoint() -> wiremock::MockBuilder {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains(
            "grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer",
        ))
        .and(body_string_contains("assertion="))
}

#[tokio::test]
async fn test_exchanged_token_is_cached_across_sessions() {
    let server = MockServer::start().await;
    token_endpoint()
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.exchanged",
            "expires_in": 3599,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider_for(&server);

    let first = provider.get_credential().await.unwrap();
    let second = provider.get_credential().await.unwrap();

    assert_eq!(first, Credential::Bearer("ya29.exchanged".to_string()));
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_missing_expires_in_defaults_to_3300_seconds() {
    let server = MockServer::start().await;
    token_endpoint()
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"access_token": "ya29.no-expiry"})),
        )
        .mount(&server)
        .await;

    let token = exchange_for(&server).exchange(1_000).await.unwrap();

    assert_eq!(token.token, "ya29.no-expiry");
    assert_eq!(token.expires_at, 4_300);
}

#[tokio::test]
async fn test_error_status_is_token_exchange_error() {
    let server = MockServer::start().await;
    token_endpoint()
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid JWT Signature."
        })))
        .mount(&server)
        .await;

    let err = provider_for(&server).get_credential().await.unwrap_err();

    match err {
        AuthError::TokenExchange(message) => {
            assert!(message.contains("400"));
            assert!(message.contains("invalid_grant"));
        }
        other => panic!("expected TokenExchange, got {other:?}"),
    }
}

#[tokio::test]
async fn test_response_without_access_token_is_rejected() {
    let server = MockServer::start().await;
    token_endpoint()
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"expires_in": 3600})))
        .mount(&server)
        .await;

    let err = provider_for(&server).get_credential().await.unwrap_err();
    assert!(matches!(err, AuthError::TokenExchange(_)));
}

#[tokio::test]
async fn test_failed_exchange_does_not_block_next_attempt() {
    let server = MockServer::start().await;
    token_endpoint()
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    token_endpoint()
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.second-try",
            "expires_in": 3600
        })))
        .mount(&server)
        .await;

    let provider = provider_for(&server);

    assert!(provider.get_credential().await.is_err());
    assert_eq!(
        provider.get_credential().await.unwrap(),
        Credential::Bearer("ya29.second-try".to_string())
    );
}

#[tokio::test]
async fn test_concurrent_sessions_share_one_exchange() {
    let server = MockServer::start().await;
    token_endpoint()
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "ya29.shared", "expires_in": 3600}))
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let provider = Arc::new(provider_for(&server));
    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let provider = provider.clone();
            tokio::spawn(async move { provider.get_credential().await })
        })
        .collect();

    for result in futures::future::join_all(tasks).await {
        assert_eq!(
            result.unwrap().unwrap(),
            Credential::Bearer("ya29.shared".to_string())
        );
    }
}

#[tokio::test]
async fn test_provider_from_config_with_inline_service_account() {
    let server = MockServer::start().await;
    token_endpoint()
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.from-config",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 8080,
        gemini_ws_url: "ws://127.0.0.1:1/ws".to_string(),
        gemini_model: "models/test".to_string(),
        system_instruction: String::new(),
        input_sample_rate: 16000,
        enable_transcripts: false,
        upstream_ping_interval_seconds: 0,
        gemini_access_token: None,
        gemini_api_key: None,
        google_credentials: Some(service_account_json()),
        oauth_scope: "https://www.googleapis.com/auth/generative-language".to_string(),
        token_url: Some(format!("{}/token", server.uri())),
        pending_audio_chunks: 10,
        max_sessions: None,
        cors_allowed_origins: None,
    };

    let provider = CredentialProvider::from_config(&config).unwrap();
    assert!(provider.is_configured());
    assert_eq!(
        provider.get_credential().await.unwrap(),
        Credential::Bearer("ya29.from-config".to_string())
    );
}

#[tokio::test]
async fn test_static_token_wins_over_service_account() {
    let server = MockServer::start().await;
    token_endpoint()
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 8080,
        gemini_ws_url: "ws://127.0.0.1:1/ws".to_string(),
        gemini_model: "models/test".to_string(),
        system_instruction: String::new(),
        input_sample_rate: 16000,
        enable_transcripts: false,
        upstream_ping_interval_seconds: 0,
        gemini_access_token: Some("static-token".to_string()),
        gemini_api_key: None,
        google_credentials: Some(service_account_json()),
        oauth_scope: "https://www.googleapis.com/auth/generative-language".to_string(),
        token_url: Some(format!("{}/token", server.uri())),
        pending_audio_chunks: 10,
        max_sessions: None,
        cors_allowed_origins: None,
    };

    let provider = CredentialProvider::from_config(&config).unwrap();
    assert_eq!(
        provider.get_credential().await.unwrap(),
        Credential::Bearer("static-token".to_string())
    );
}

#[tokio::test]
async fn test_key_file_token_uri_used_when_no_endpoint_configured() {
    let server = MockServer::start().await;
    token_endpoint()
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.from-key-file",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let key_json = json!({
        "type": "service_account",
        "client_email": "relay@test-project.iam.gserviceaccount.com",
        "private_key": TEST_PRIVATE_KEY,
        "token_uri": format!("{}/token", server.uri()),
    })
    .to_string();

    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 8080,
        gemini_ws_url: "ws://127.0.0.1:1/ws".to_string(),
        gemini_model: "models/test".to_string(),
        system_instruction: String::new(),
        input_sample_rate: 16000,
        enable_transcripts: false,
        upstream_ping_interval_seconds: 0,
        gemini_access_token: None,
        gemini_api_key: None,
        google_credentials: Some(key_json),
        oauth_scope: "https://www.googleapis.com/auth/generative-language".to_string(),
        token_url: None,
        pending_audio_chunks: 10,
        max_sessions: None,
        cors_allowed_origins: None,
    };

    let provider = CredentialProvider::from_config(&config).unwrap();
    assert_eq!(
        provider.get_credential().await.unwrap(),
        Credential::Bearer("ya29.from-key-file".to_string())
    );
}
