//! Gemini Live API connector implementation.
//!
//! This module provides the connector that opens a `BidiGenerateContent`
//! WebSocket, sends the session setup, and runs one background task per
//! connection that serializes outgoing messages, decodes incoming frames into
//! [`UpstreamEvent`]s, and keeps the socket alive with periodic pings.
//!
//! # API Reference
//!
//! - Endpoint: `wss://generativelanguage.googleapis.com/ws/...BidiGenerateContent`
//! - Protocol: WebSocket with JSON messages (text or binary frames)
//! - Audio in: PCM 16-bit, 16kHz, mono, little-endian, base64 encoded
//! - Audio out: PCM 16-bit, 24kHz, mono, little-endian, base64 encoded

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use http::{HeaderName, HeaderValue};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{self, Message};

use super::config::{API_KEY_HEADER, GeminiConfig};
use super::messages::{ClientMessage, ServerMessage};
use crate::core::auth::Credential;
use crate::core::realtime::base::{
    RealtimeError, RealtimeResult, UpstreamConnector, UpstreamEvent, UpstreamHandle, UpstreamLink,
};

/// Channel capacity for WebSocket message sending.
const WS_CHANNEL_CAPACITY: usize = 256;

/// Channel capacity for events delivered to the relay session.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// How long `close` waits for the connection task to finish.
const CLOSE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

// =============================================================================
// Connector
// =============================================================================

/// Opens Gemini Live sessions.
#[derive(Debug, Clone)]
pub struct GeminiConnector {
    config: GeminiConfig,
}

impl GeminiConnector {
    pub fn new(config: GeminiConfig) -> Self {
        Self { config }
    }

    fn build_request(
        &self,
        credential: &Credential,
    ) -> RealtimeResult<tungstenite::handshake::client::Request> {
        let mut request = self
            .config
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| RealtimeError::InvalidConfiguration(format!("invalid upstream URL: {e}")))?;

        let (name, value) = match credential {
            Credential::Bearer(token) => (http::header::AUTHORIZATION, format!("Bearer {token}")),
            Credential::ApiKey(key) => (HeaderName::from_static(API_KEY_HEADER), key.clone()),
        };
        let mut value = HeaderValue::from_str(&value).map_err(|_| {
            RealtimeError::InvalidConfiguration("credential is not a valid header value".to_string())
        })?;
        value.set_sensitive(true);
        request.headers_mut().insert(name, value);

        Ok(request)
    }
}

#[async_trait]
impl UpstreamConnector for GeminiConnector {
    async fn connect(&self, credential: &Credential) -> RealtimeResult<UpstreamHandle> {
        let request = self.build_request(credential)?;

        tracing::info!(
            model = %self.config.model,
            credential = credential.kind(),
            "Connecting to Gemini Live API"
        );

        let (ws_stream, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| RealtimeError::ConnectionFailed(e.to_string()))?;

        let (mut ws_sink, ws_stream) = ws_stream.split();

        // Setup goes out before anything else can be queued.
        let setup = serde_json::to_string(&ClientMessage::setup(&self.config))
            .map_err(|e| RealtimeError::SerializationError(e.to_string()))?;
        ws_sink
            .send(Message::Text(setup.into()))
            .await
            .map_err(|e| RealtimeError::ConnectionFailed(format!("failed to send setup: {e}")))?;
        tracing::info!("Sent Gemini setup");

        let (command_tx, command_rx) = mpsc::channel::<LinkCommand>(WS_CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel::<UpstreamEvent>(EVENT_CHANNEL_CAPACITY);

        let keepalive = self.config.ping_interval.map(|period| {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });

        let task = tokio::spawn(run_connection(
            ws_sink, ws_stream, command_rx, event_tx, keepalive,
        ));

        let link = GeminiLink {
            commands: command_tx,
            mime_type: self.config.input_mime_type(),
            task: Some(task),
        };

        Ok(UpstreamHandle {
            link: Box::new(link),
            events: event_rx,
        })
    }
}

// =============================================================================
// Link
// =============================================================================

enum LinkCommand {
    Send(ClientMessage),
    Close,
}

/// Sending half of a Gemini connection.
pub struct GeminiLink {
    commands: mpsc::Sender<LinkCommand>,
    mime_type: String,
    task: Option<JoinHandle<()>>,
}

impl GeminiLink {
    async fn send_command(&self, command: LinkCommand) -> RealtimeResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| RealtimeError::LinkClosed)
    }
}

#[async_trait]
impl UpstreamLink for GeminiLink {
    async fn send_audio(&mut self, chunk: Bytes) -> RealtimeResult<()> {
        let message = ClientMessage::audio(&chunk, &self.mime_type);
        self.send_command(LinkCommand::Send(message)).await
    }

    async fn end_audio_stream(&mut self) -> RealtimeResult<()> {
        self.send_command(LinkCommand::Send(ClientMessage::audio_stream_end()))
            .await
    }

    async fn close(&mut self) -> RealtimeResult<()> {
        let Some(task) = self.task.take() else {
            return Ok(());
        };

        let result = self.send_command(LinkCommand::Close).await;
        if result.is_err() {
            // Connection task already gone.
            task.abort();
            return Ok(());
        }

        let abort = task.abort_handle();
        if tokio::time::timeout(CLOSE_TIMEOUT, task).await.is_err() {
            tracing::warn!("Timed out waiting for Gemini connection task to close");
            abort.abort();
        }
        Ok(())
    }
}

impl Drop for GeminiLink {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// =============================================================================
// Connection Task
// =============================================================================

type WsSink = futures_util::stream::SplitSink<
    tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >,
    Message,
>;
type WsStream = futures_util::stream::SplitStream<
    tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >,
>;

async fn run_connection(
    mut ws_sink: WsSink,
    mut ws_stream: WsStream,
    mut commands: mpsc::Receiver<LinkCommand>,
    events: mpsc::Sender<UpstreamEvent>,
    mut keepalive: Option<Interval>,
) {
    loop {
        let delivery = tokio::select! {
            // Handle outgoing messages
            command = commands.recv() => {
                match command {
                    Some(LinkCommand::Send(message)) => {
                        if let Err(e) = send_message(&mut ws_sink, &message).await {
                            let _ = events.try_send(UpstreamEvent::Failed(e.to_string()));
                            break;
                        }
                        Delivery::Delivered
                    }
                    Some(LinkCommand::Close) | None => Delivery::CloseRequested,
                }
            }

            // Handle incoming messages
            incoming = ws_stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        forward_message(text.as_bytes(), &events, &mut commands, &mut ws_sink).await
                    }
                    Some(Ok(Message::Binary(data))) => {
                        forward_message(&data, &events, &mut commands, &mut ws_sink).await
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = ws_sink.send(Message::Pong(data)).await {
                            tracing::error!("Failed to send pong: {}", e);
                        }
                        Delivery::Delivered
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = frame
                            .map(|f| (Some(u16::from(f.code)), f.reason.to_string()))
                            .unwrap_or((None, String::new()));
                        tracing::info!(?code, %reason, "Gemini WebSocket closed by server");
                        let event = UpstreamEvent::Closed { code, reason };
                        deliver(event, &events, &mut commands, &mut ws_sink).await;
                        break;
                    }
                    Some(Ok(_)) => Delivery::Delivered,
                    Some(Err(e)) => {
                        tracing::error!("Gemini WebSocket error: {}", e);
                        let event = UpstreamEvent::Failed(e.to_string());
                        deliver(event, &events, &mut commands, &mut ws_sink).await;
                        break;
                    }
                    None => {
                        let event = UpstreamEvent::Closed {
                            code: None,
                            reason: "stream ended".to_string(),
                        };
                        deliver(event, &events, &mut commands, &mut ws_sink).await;
                        break;
                    }
                }
            }

            _ = next_tick(&mut keepalive) => {
                if let Err(e) = ws_sink.send(Message::Ping(Bytes::new())).await {
                    tracing::warn!("Failed to send keepalive ping: {}", e);
                }
                Delivery::Delivered
            }
        };

        match delivery {
            Delivery::Delivered | Delivery::SessionGone => {}
            Delivery::CloseRequested => {
                close_socket(&mut ws_sink).await;
                break;
            }
            Delivery::Failed => break,
        }
    }

    tracing::info!("Gemini connection task ended");
}

/// Outcome of handing work to the relay session.
enum Delivery {
    Delivered,
    /// The event receiver was dropped; the connection keeps serving commands.
    SessionGone,
    CloseRequested,
    Failed,
}

async fn send_message(ws_sink: &mut WsSink, message: &ClientMessage) -> Result<(), tungstenite::Error> {
    let json = match serde_json::to_string(message) {
        Ok(j) => j,
        Err(e) => {
            tracing::error!("Failed to serialize Gemini message: {}", e);
            return Ok(());
        }
    };

    ws_sink.send(Message::Text(json.into())).await.inspect_err(|e| {
        tracing::error!("Failed to send WebSocket message: {}", e);
    })
}

async fn close_socket(ws_sink: &mut WsSink) {
    let frame = CloseFrame {
        code: CloseCode::Normal,
        reason: "".into(),
    };
    if let Err(e) = ws_sink.send(Message::Close(Some(frame))).await {
        tracing::debug!("Failed to send Gemini close frame: {}", e);
    }
    let _ = ws_sink.close().await;
}

async fn forward_message(
    raw: &[u8],
    events: &mpsc::Sender<UpstreamEvent>,
    commands: &mut mpsc::Receiver<LinkCommand>,
    ws_sink: &mut WsSink,
) -> Delivery {
    let message = match ServerMessage::parse(raw) {
        Ok(message) => message,
        Err(e) => {
            tracing::debug!("Ignoring provider message: {}", e);
            return Delivery::Delivered;
        }
    };
    for event in message.into_events() {
        match deliver(event, events, commands, ws_sink).await {
            Delivery::Delivered => {}
            other => return other,
        }
    }
    Delivery::Delivered
}

/// Wait for room in the event channel while still serving link commands,
/// so a session that has stopped reading can always close the link.
async fn deliver(
    event: UpstreamEvent,
    events: &mpsc::Sender<UpstreamEvent>,
    commands: &mut mpsc::Receiver<LinkCommand>,
    ws_sink: &mut WsSink,
) -> Delivery {
    loop {
        tokio::select! {
            biased;

            command = commands.recv() => match command {
                Some(LinkCommand::Send(message)) => {
                    if send_message(ws_sink, &message).await.is_err() {
                        return Delivery::Failed;
                    }
                }
                Some(LinkCommand::Close) | None => return Delivery::CloseRequested,
            },

            permit = events.reserve() => {
                return match permit {
                    Ok(permit) => {
                        permit.send(event);
                        Delivery::Delivered
                    }
                    Err(_) => Delivery::SessionGone,
                };
            }
        }
    }
}

async fn next_tick(keepalive: &mut Option<Interval>) {
    match keepalive {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
