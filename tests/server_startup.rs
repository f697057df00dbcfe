//! Server Startup Tests
//!
//! Tests for server lifecycle, configuration loading, and startup behavior.
//! These tests verify that the server can start correctly under various conditions.

use std::net::TcpListener;
use std::sync::Arc;

use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use tower::util::ServiceExt;

use voice_relay_gateway::{ServerConfig, routes, state::AppState};

/// Helper function to create a minimal test configuration
fn create_minimal_config(port: u16) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port,
        gemini_ws_url: "ws://127.0.0.1:1/ws".to_string(),
        gemini_model: "models/gemini-2.5-flash-native-audio-preview-12-2025".to_string(),
        system_instruction: "Be brief.".to_string(),
        input_sample_rate: 16000,
        enable_transcripts: false,
        upstream_ping_interval_seconds: 20,
        gemini_access_token: None,
        gemini_api_key: None,
        google_credentials: None,
        oauth_scope: "https://www.googleapis.com/auth/generative-language".to_string(),
        token_url: None,
        pending_audio_chunks: 10,
        max_sessions: None,
        cors_allowed_origins: None,
    }
}

/// Find an available port for testing
fn find_available_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind to random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

async fn get_body(app: axum::Router, uri: &str) -> (StatusCode, String) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), 1024).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

/// The server boots without any upstream credentials
#[tokio::test]
async fn test_minimal_config_boot() {
    let config = create_minimal_config(find_available_port());
    let app_state = AppState::new(config).unwrap();

    let app = routes::api::create_api_router().with_state(app_state);

    let (status, body) = get_body(app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Voice Relay Gateway");
}

#[tokio::test]
async fn test_health_check() {
    let config = create_minimal_config(find_available_port());
    let app_state = AppState::new(config).unwrap();

    let app = routes::api::create_api_router()
        .merge(routes::relay::create_relay_router())
        .with_state(app_state);

    let (status, body) = get_body(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
}

/// A plain GET on the relay route is not a WebSocket upgrade
#[tokio::test]
async fn test_relay_route_requires_upgrade() {
    let config = create_minimal_config(find_available_port());
    let app_state = AppState::new(config).unwrap();

    let app = routes::relay::create_relay_router().with_state(app_state);

    let request = Request::builder().uri("/ws").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_invalid_service_account_fails_startup() {
    let mut config = create_minimal_config(find_available_port());
    config.google_credentials = Some("/nonexistent/service-account.json".to_string());

    assert!(AppState::new(config).is_err());
}

#[tokio::test]
async fn test_router_uses_configured_limits() {
    let mut config = create_minimal_config(find_available_port());
    config.max_sessions = Some(3);
    config.gemini_api_key = Some("test-key".to_string());

    let app_state = AppState::new(config).unwrap();
    assert_eq!(app_state.router.active_sessions(), 0);
    assert_eq!(app_state.config.max_sessions, Some(3));
    assert!(app_state.config.has_upstream_credentials());
}

#[tokio::test]
async fn test_concurrent_app_state_creation() {
    let handles: Vec<_> = (0..5)
        .map(|_| {
            tokio::spawn(async {
                let config = create_minimal_config(find_available_port());
                AppState::new(config).map(|state| Arc::strong_count(&state))
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), 1);
    }
}

#[test]
fn test_address_parsing() {
    let config = create_minimal_config(3001);
    let addr: std::net::SocketAddr = config.address().parse().unwrap();
    assert_eq!(addr.port(), 3001);
}
