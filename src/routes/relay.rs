//! Relay WebSocket route configuration

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::relay::{relay_handler, relay_session_handler};
use crate::state::AppState;
use std::sync::Arc;

/// Create the relay WebSocket router
///
/// # Endpoints
///
/// - `GET /ws` - WebSocket upgrade, optional `?session_id=` label
/// - `GET /ws/{session_id}` - WebSocket upgrade with the label in the path
///
/// # Protocol
///
/// Clients send:
/// - Binary frames: PCM 16-bit little-endian, 16kHz, mono
/// - `{"type": "stop"}` to end the conversation
///
/// Server responds with:
/// - `ready` once the provider session is set up
/// - Binary frames: PCM 16-bit little-endian, 24kHz, mono
/// - `interrupted` when the caller barges in
/// - `turn_complete` at the end of each model turn
/// - `transcript` when transcripts are enabled
/// - `error` on failures
pub fn create_relay_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ws", get(relay_handler))
        .route("/ws/{session_id}", get(relay_session_handler))
        .layer(TraceLayer::new_for_http())
}
