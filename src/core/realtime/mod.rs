//! Realtime upstream provider module.
//!
//! This module provides the provider side of a relay session: a connector
//! that opens one streaming connection per session and a link that carries
//! caller audio to the provider while decoded events flow back on a channel.
//!
//! # Supported Providers
//!
//! - **Gemini Live API** - Native-audio conversations over `BidiGenerateContent`
//!
//! # Architecture
//!
//! - `UpstreamConnector` opens a connection and sends the setup message
//! - `UpstreamLink` is the write half, owned by exactly one session
//! - `UpstreamEvent`s arrive on an `mpsc` channel in provider order

mod base;
pub mod gemini;

pub use base::{
    RealtimeError, RealtimeResult, TranscriptRole, UpstreamConnector, UpstreamEvent,
    UpstreamHandle, UpstreamLink,
};
pub use gemini::{GeminiConfig, GeminiConnector};
