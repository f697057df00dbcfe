//! Gemini Live API module.
//!
//! This module provides the upstream connector for Google's Gemini Live API
//! (`BidiGenerateContent`), used for native-audio conversations.
//!
//! # Features
//!
//! - Bearer token or API key authentication
//! - Setup with persona, audio response modality and server-side barge-in
//! - Base64 PCM audio envelopes in both directions
//! - Optional input/output transcription
//! - Keepalive pings
//!
//! # Example
//!
//! ```rust,ignore
//! use voice_relay_gateway::core::auth::Credential;
//! use voice_relay_gateway::core::realtime::{GeminiConfig, GeminiConnector, UpstreamConnector};
//!
//! #[tokio::main]
//! async fn main() {
//!     let connector = GeminiConnector::new(GeminiConfig::default());
//!     let mut handle = connector
//!         .connect(&Credential::Bearer("ya29...".to_string()))
//!         .await
//!         .unwrap();
//!
//!     while let Some(event) = handle.events.recv().await {
//!         println!("{event:?}");
//!     }
//! }
//! ```

mod client;
mod config;
mod messages;

pub use client::{GeminiConnector, GeminiLink};
pub use config::{
    API_KEY_HEADER, DEFAULT_GEMINI_MODEL, DEFAULT_INPUT_SAMPLE_RATE, DEFAULT_PING_INTERVAL_SECS,
    DEFAULT_SYSTEM_INSTRUCTION, GEMINI_LIVE_URL, GeminiConfig,
    START_OF_ACTIVITY_INTERRUPTS,
};
pub use messages::{ClientMessage, PROVIDER_ERROR_MESSAGE, ServerMessage};
