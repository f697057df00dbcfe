//! Relay WebSocket handler
//!
//! Upgrades browser connections and hands each one to the session router.
//! Binary frames carry caller audio, text frames carry JSON control messages.

use async_trait::async_trait;
use axum::{
    extract::{
        Path, Query, State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code},
    },
    response::Response,
};
use bytes::Bytes;
use futures::{SinkExt, StreamExt, future, stream::SplitSink};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::relay::{ClientFrame, ClientLink, ClientLinkError, RelayOutgoingMessage};
use crate::state::AppState;

/// Maximum WebSocket frame size (10 MB)
const MAX_WS_FRAME_SIZE: usize = 10 * 1024 * 1024;

/// Maximum WebSocket message size (10 MB)
const MAX_WS_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

/// Query parameters accepted on `/ws`
#[derive(Debug, Default, Deserialize)]
pub struct RelayParams {
    /// Optional client-chosen session label
    pub session_id: Option<String>,
}

/// Relay WebSocket handler for `/ws`
///
/// The session label comes from the `session_id` query parameter, or a
/// fresh UUID when absent.
pub async fn relay_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(params): Query<RelayParams>,
) -> Response {
    let session_id = params
        .session_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    upgrade(ws, state, session_id)
}

/// Relay WebSocket handler for `/ws/{session_id}`
pub async fn relay_session_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Response {
    upgrade(ws, state, session_id)
}

fn upgrade(ws: WebSocketUpgrade, state: Arc<AppState>, session_id: String) -> Response {
    info!(session_id = %session_id, "Relay WebSocket connection upgrade requested");

    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_relay_socket(socket, state, session_id))
}

async fn handle_relay_socket(socket: WebSocket, state: Arc<AppState>, session_id: String) {
    info!(session_id = %session_id, "Relay WebSocket connection established");

    let (sender, receiver) = socket.split();
    let client = Box::new(AxumClientLink::new(sender));
    let frames = receiver.filter_map(|result| future::ready(client_frame(result)));

    if let Err(e) = state.router.route(session_id.clone(), client, frames).await {
        error!(session_id = %session_id, "Relay session task failed: {}", e);
    }
}

/// Map one raw WebSocket message to a relay frame.
///
/// Ping and pong are answered by axum and produce nothing. Transport errors
/// count as a client close.
fn client_frame(result: Result<Message, axum::Error>) -> Option<ClientFrame> {
    match result {
        Ok(Message::Binary(data)) => Some(ClientFrame::Audio(data)),
        Ok(Message::Text(text)) => ClientFrame::from_text(text.as_str()),
        Ok(Message::Close(frame)) => {
            debug!(?frame, "Client sent close frame");
            Some(ClientFrame::Closed)
        }
        Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => None,
        Err(e) => {
            debug!("Client WebSocket error: {}", e);
            Some(ClientFrame::Closed)
        }
    }
}

/// Client link backed by the write half of an axum WebSocket.
pub struct AxumClientLink {
    sender: SplitSink<WebSocket, Message>,
    closed: bool,
}

impl AxumClientLink {
    pub fn new(sender: SplitSink<WebSocket, Message>) -> Self {
        Self {
            sender,
            closed: false,
        }
    }

    async fn send(&mut self, message: Message) -> Result<(), ClientLinkError> {
        if self.closed {
            return Err(ClientLinkError::Closed);
        }
        self.sender
            .send(message)
            .await
            .map_err(|e| ClientLinkError::Send(e.to_string()))
    }
}

#[async_trait]
impl ClientLink for AxumClientLink {
    async fn send_message(&mut self, message: RelayOutgoingMessage) -> Result<(), ClientLinkError> {
        let json = serde_json::to_string(&message)
            .map_err(|e| ClientLinkError::Serialization(e.to_string()))?;
        self.send(Message::Text(json.into())).await
    }

    async fn send_audio(&mut self, chunk: Bytes) -> Result<(), ClientLinkError> {
        self.send(Message::Binary(chunk)).await
    }

    async fn close(&mut self) -> Result<(), ClientLinkError> {
        if self.closed {
            return Ok(());
        }
        let result = self
            .send(Message::Close(Some(CloseFrame {
                code: close_code::NORMAL,
                reason: Utf8Bytes::from_static(""),
            })))
            .await;
        self.closed = true;
        result
    }
}
