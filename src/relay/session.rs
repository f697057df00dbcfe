//! One relay session: a client connection paired with one upstream connection.
//!
//! All mutable session state is owned by a single task. Client frames,
//! upstream events and the connection attempt are multiplexed with
//! `tokio::select!`, so no two handlers ever run against the same fields.

use std::pin::pin;
use std::sync::Arc;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::SessionError;
use super::link::ClientLink;
use super::messages::{ClientFrame, RelayIncomingMessage, RelayOutgoingMessage};
use super::pending::PendingAudio;
use super::state::SessionState;
use crate::core::auth::CredentialProvider;
use crate::core::realtime::{UpstreamConnector, UpstreamEvent, UpstreamHandle, UpstreamLink};

/// Message sent to the client when the connection attempt fails without detail.
pub const CONNECTION_FAILED_MESSAGE: &str = "Gemini connection failed";

/// Message sent to the client when the provider goes away before setup completes.
pub const UPSTREAM_CLOSED_MESSAGE: &str = "Gemini connection closed before session was ready";

enum Flow {
    Continue,
    Stop,
}

enum Step {
    Connected(Result<UpstreamHandle, SessionError>),
    Client(Option<ClientFrame>),
    Upstream(Option<UpstreamEvent>),
}

/// A single client/upstream pairing.
///
/// Created by the [`SessionRouter`](super::SessionRouter) for every accepted
/// client connection and discarded after [`teardown`](Self::teardown).
pub struct RelaySession {
    id: String,
    state: SessionState,
    client: Box<dyn ClientLink>,
    upstream: Option<Box<dyn UpstreamLink>>,
    pending: PendingAudio,
    ready: bool,
    terminated: bool,
    credentials: Arc<CredentialProvider>,
    connector: Arc<dyn UpstreamConnector>,
}

impl RelaySession {
    pub fn new(
        id: impl Into<String>,
        client: Box<dyn ClientLink>,
        credentials: Arc<CredentialProvider>,
        connector: Arc<dyn UpstreamConnector>,
        pending_audio_chunks: usize,
    ) -> Self {
        Self {
            id: id.into(),
            state: SessionState::Connecting,
            client,
            upstream: None,
            pending: PendingAudio::new(pending_audio_chunks),
            ready: false,
            terminated: false,
            credentials,
            connector,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Drive the session until either side ends it, then tear down.
    ///
    /// `frames` yields decoded client frames; the stream ending is treated
    /// like a client close.
    pub async fn run<S>(&mut self, frames: S)
    where
        S: Stream<Item = ClientFrame> + Send,
    {
        let mut frames = pin!(frames);

        self.state = SessionState::Handshaking;
        info!(session_id = %self.id, "Relay session handshaking");

        let mut opening = pin!(open_upstream(
            Arc::clone(&self.credentials),
            Arc::clone(&self.connector),
        ));
        let mut connecting = true;
        let mut events: Option<mpsc::Receiver<UpstreamEvent>> = None;

        loop {
            let step = tokio::select! {
                result = &mut opening, if connecting => {
                    connecting = false;
                    Step::Connected(result)
                }
                frame = frames.next() => Step::Client(frame),
                event = next_event(&mut events) => Step::Upstream(event),
            };

            let flow = match step {
                Step::Connected(Ok(handle)) => {
                    debug!(session_id = %self.id, "Upstream connected, awaiting setup-complete");
                    self.upstream = Some(handle.link);
                    events = Some(handle.events);
                    Flow::Continue
                }
                Step::Connected(Err(e)) => self.fail_startup(e).await,
                Step::Client(Some(frame)) => self.handle_client_frame(frame).await,
                Step::Client(None) => {
                    debug!(session_id = %self.id, "Client frame stream ended");
                    Flow::Stop
                }
                Step::Upstream(Some(event)) => self.handle_upstream_event(event).await,
                Step::Upstream(None) => {
                    events = None;
                    self.handle_upstream_event(UpstreamEvent::Closed {
                        code: None,
                        reason: String::new(),
                    })
                    .await
                }
            };

            if let Flow::Stop = flow {
                break;
            }
        }

        // Unread events must not hold up the upstream close.
        drop(events);
        self.teardown().await;
    }

    async fn handle_client_frame(&mut self, frame: ClientFrame) -> Flow {
        match frame {
            ClientFrame::Audio(chunk) => self.handle_client_audio(chunk).await,
            ClientFrame::Control(RelayIncomingMessage::Stop) => {
                info!(session_id = %self.id, "Client requested stop");
                if let Some(upstream) = self.upstream.as_mut()
                    && let Err(e) = upstream.end_audio_stream().await
                {
                    debug!(session_id = %self.id, "End-of-stream signal failed: {}", e);
                }
                Flow::Stop
            }
            ClientFrame::Closed => {
                info!(session_id = %self.id, "Client disconnected");
                Flow::Stop
            }
        }
    }

    async fn handle_client_audio(&mut self, chunk: Bytes) -> Flow {
        if !self.ready {
            if !self.pending.push(chunk) {
                debug!(
                    session_id = %self.id,
                    dropped = self.pending.dropped(),
                    "Pending audio full, dropping chunk"
                );
            }
            return Flow::Continue;
        }

        let Some(upstream) = self.upstream.as_mut() else {
            return Flow::Continue;
        };
        match upstream.send_audio(chunk).await {
            Ok(()) => Flow::Continue,
            Err(e) => {
                warn!(session_id = %self.id, "Failed to forward audio upstream: {}", e);
                Flow::Stop
            }
        }
    }

    async fn handle_upstream_event(&mut self, event: UpstreamEvent) -> Flow {
        match event {
            UpstreamEvent::SetupComplete => self.become_ready().await,
            UpstreamEvent::ProviderError { message, details } => {
                warn!(session_id = %self.id, "Provider reported error: {}", details);
                self.notify(RelayOutgoingMessage::Error {
                    message,
                    details: Some(details),
                })
                .await
            }
            UpstreamEvent::Interrupted => {
                debug!(session_id = %self.id, "Provider interrupted model speech");
                self.notify(RelayOutgoingMessage::Interrupted).await
            }
            UpstreamEvent::Audio(chunk) => {
                if !self.ready {
                    debug!(session_id = %self.id, "Dropping provider audio received before setup-complete");
                    return Flow::Continue;
                }
                match self.client.send_audio(chunk).await {
                    Ok(()) => Flow::Continue,
                    Err(e) => {
                        debug!(session_id = %self.id, "Failed to send audio to client: {}", e);
                        Flow::Stop
                    }
                }
            }
            UpstreamEvent::Transcript { role, text } => {
                self.notify(RelayOutgoingMessage::Transcript { role, text })
                    .await
            }
            UpstreamEvent::TurnComplete => self.notify(RelayOutgoingMessage::TurnComplete).await,
            UpstreamEvent::Closed { code, reason } => {
                info!(session_id = %self.id, ?code, %reason, "Upstream closed");
                if !self.ready {
                    let _ = self
                        .client
                        .send_message(RelayOutgoingMessage::error(UPSTREAM_CLOSED_MESSAGE))
                        .await;
                }
                Flow::Stop
            }
            UpstreamEvent::Failed(error) => {
                warn!(session_id = %self.id, "Upstream connection failed: {}", error);
                if !self.ready {
                    let message = if error.is_empty() {
                        CONNECTION_FAILED_MESSAGE.to_string()
                    } else {
                        error
                    };
                    let _ = self
                        .client
                        .send_message(RelayOutgoingMessage::error(message))
                        .await;
                }
                Flow::Stop
            }
        }
    }

    async fn become_ready(&mut self) -> Flow {
        if self.ready {
            debug!(session_id = %self.id, "Ignoring repeated setup-complete");
            return Flow::Continue;
        }

        self.ready = true;
        self.state = SessionState::Ready;
        info!(session_id = %self.id, buffered = self.pending.len(), "Relay session ready");

        if let Flow::Stop = self.notify(RelayOutgoingMessage::Ready).await {
            return Flow::Stop;
        }

        if let Some(upstream) = self.upstream.as_mut() {
            for chunk in self.pending.drain() {
                if let Err(e) = upstream.send_audio(chunk).await {
                    warn!(session_id = %self.id, "Failed to flush pending audio: {}", e);
                    return Flow::Stop;
                }
            }
        }

        self.state = SessionState::Running;
        Flow::Continue
    }

    async fn notify(&mut self, message: RelayOutgoingMessage) -> Flow {
        match self.client.send_message(message).await {
            Ok(()) => Flow::Continue,
            Err(e) => {
                debug!(session_id = %self.id, "Failed to notify client: {}", e);
                Flow::Stop
            }
        }
    }

    async fn fail_startup(&mut self, error: SessionError) -> Flow {
        warn!(session_id = %self.id, "Relay session failed to start: {}", error);
        let message = error.to_string();
        let message = if message.is_empty() {
            CONNECTION_FAILED_MESSAGE.to_string()
        } else {
            message
        };
        let _ = self
            .client
            .send_message(RelayOutgoingMessage::error(message))
            .await;
        Flow::Stop
    }

    /// Close both links and release buffered audio. Safe to call repeatedly.
    pub async fn teardown(&mut self) {
        if self.terminated {
            return;
        }
        self.terminated = true;
        self.state = SessionState::Closing;

        if let Err(e) = self.client.close().await {
            debug!(session_id = %self.id, "Client close failed: {}", e);
        }
        if let Some(mut upstream) = self.upstream.take()
            && let Err(e) = upstream.close().await
        {
            debug!(session_id = %self.id, "Upstream close failed: {}", e);
        }

        self.pending.clear();
        self.ready = false;
        self.state = SessionState::Closed;
        info!(session_id = %self.id, "Relay session closed");
    }
}

async fn open_upstream(
    credentials: Arc<CredentialProvider>,
    connector: Arc<dyn UpstreamConnector>,
) -> Result<UpstreamHandle, SessionError> {
    let credential = credentials.get_credential().await?;
    debug!(kind = credential.kind(), "Resolved upstream credential");
    Ok(connector.connect(&credential).await?)
}

async fn next_event(events: &mut Option<mpsc::Receiver<UpstreamEvent>>) -> Option<UpstreamEvent> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
