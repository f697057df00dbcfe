//! WebSocket Mock Server for the Gemini Live API
//!
//! Speaks enough of `BidiGenerateContent` to drive a relay session:
//! answers the setup message, echoes caller audio back as model audio and
//! answers end-of-stream with a turn-complete.

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

/// How the mock reacts to the setup message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupBehavior {
    /// Reply with `setupComplete` right away
    Immediate,
    /// Reply with `setupComplete` once [`MockGemini::release_setup`] is called
    WaitForRelease,
    /// Close the connection instead of replying
    CloseBeforeReady,
    /// Reply with `setupComplete`, then push this many `turnComplete` messages
    Flood(usize),
}

/// Everything the mock observed
pub struct MockGeminiState {
    pub behavior: SetupBehavior,
    pub release: Notify,
    pub received: Mutex<Vec<Value>>,
    pub authorization: Mutex<Vec<Option<String>>>,
    pub api_keys: Mutex<Vec<Option<String>>>,
    pub connections: AtomicUsize,
    pub client_closes: AtomicUsize,
    pub pings: AtomicUsize,
}

impl MockGeminiState {
    fn new(behavior: SetupBehavior) -> Self {
        Self {
            behavior,
            release: Notify::new(),
            received: Mutex::new(Vec::new()),
            authorization: Mutex::new(Vec::new()),
            api_keys: Mutex::new(Vec::new()),
            connections: AtomicUsize::new(0),
            client_closes: AtomicUsize::new(0),
            pings: AtomicUsize::new(0),
        }
    }

    /// All caller audio chunks received so far, decoded.
    pub fn audio_chunks(&self) -> Vec<Vec<u8>> {
        use base64::prelude::*;

        self.received
            .lock()
            .iter()
            .filter_map(|message| message.pointer("/realtimeInput/audio/data"))
            .filter_map(Value::as_str)
            .filter_map(|data| BASE64_STANDARD.decode(data).ok())
            .collect()
    }

    pub fn setup_messages(&self) -> Vec<Value> {
        self.received
            .lock()
            .iter()
            .filter_map(|message| message.get("setup").cloned())
            .collect()
    }

    pub fn saw_audio_stream_end(&self) -> bool {
        self.received
            .lock()
            .iter()
            .any(|message| message.pointer("/realtimeInput/audioStreamEnd") == Some(&json!(true)))
    }
}

/// A running mock server
pub struct MockGemini {
    pub url: String,
    pub state: Arc<MockGeminiState>,
}

impl MockGemini {
    pub async fn start(behavior: SetupBehavior) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock Gemini server");
        let addr = listener.local_addr().expect("Mock Gemini server has no address");
        let state = Arc::new(MockGeminiState::new(behavior));

        let accept_state = state.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let state = accept_state.clone();
                tokio::spawn(async move {
                    let _ = handle_connection(stream, state).await;
                });
            }
        });

        Self {
            url: format!("ws://{}/ws", addr),
            state,
        }
    }

    /// Let a `WaitForRelease` session complete its setup.
    pub fn release_setup(&self) {
        self.state.release.notify_one();
    }
}

fn header(request: &Request, name: &str) -> Option<String> {
    request
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

async fn handle_connection(
    stream: TcpStream,
    state: Arc<MockGeminiState>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let handshake_state = state.clone();
    let callback = move |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
        handshake_state
            .authorization
            .lock()
            .push(header(request, "authorization"));
        handshake_state
            .api_keys
            .lock()
            .push(header(request, "x-goog-api-key"));
        Ok(response)
    };

    let ws_stream = accept_hdr_async(stream, callback).await?;
    let (mut write, mut read) = ws_stream.split();
    state.connections.fetch_add(1, Ordering::SeqCst);

    while let Some(msg) = read.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                let Ok(message) = serde_json::from_str::<Value>(text.as_str()) else {
                    continue;
                };
                state.received.lock().push(message.clone());

                if message.get("setup").is_some() {
                    match state.behavior {
                        SetupBehavior::Immediate | SetupBehavior::Flood(_) => {}
                        SetupBehavior::WaitForRelease => state.release.notified().await,
                        SetupBehavior::CloseBeforeReady => {
                            write.send(Message::Close(None)).await?;
                            break;
                        }
                    }
                    let reply = json!({"setupComplete": {}});
                    write.send(Message::Text(reply.to_string().into())).await?;

                    if let SetupBehavior::Flood(count) = state.behavior {
                        let turn = json!({"serverContent": {"turnComplete": true}}).to_string();
                        for _ in 0..count {
                            write.send(Message::Text(turn.clone().into())).await?;
                        }
                    }
                } else if let Some(data) = message.pointer("/realtimeInput/audio/data") {
                    // Gemini delivers JSON in binary frames too.
                    let reply = json!({
                        "serverContent": {
                            "modelTurn": {
                                "parts": [{
                                    "inlineData": {"mimeType": "audio/pcm;rate=24000", "data": data}
                                }]
                            }
                        }
                    });
                    write
                        .send(Message::Binary(Bytes::from(reply.to_string())))
                        .await?;
                } else if message.pointer("/realtimeInput/audioStreamEnd").is_some() {
                    let reply = json!({"serverContent": {"turnComplete": true}});
                    write.send(Message::Text(reply.to_string().into())).await?;
                }
            }
            Ok(Message::Ping(_)) => {
                state.pings.fetch_add(1, Ordering::SeqCst);
            }
            Ok(Message::Close(_)) => {
                state.client_closes.fetch_add(1, Ordering::SeqCst);
                break;
            }
            Ok(_) => {}
            Err(_) => break,
        }
    }

    Ok(())
}
