//! Base traits and types for realtime upstream providers.
//!
//! This module defines the foundational abstractions for the provider side
//! of a relay session: one streaming connection, opened with a credential,
//! that accepts caller audio and emits semantic events.
//!
//! # Supported Providers
//!
//! - Gemini Live API (BidiGenerateContent)
//!
//! # Audio Format
//!
//! Caller audio is PCM 16-bit signed little-endian at the configured input
//! rate (16kHz by default). Provider audio is PCM 16-bit at 24kHz.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::core::auth::Credential;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur on the upstream link.
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// The provider did not accept the connection upgrade
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Malformed or unexpected provider message
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// The link has been closed and can no longer send
    #[error("Link closed")]
    LinkClosed,
}

/// Result type for upstream operations.
pub type RealtimeResult<T> = Result<T, RealtimeError>;

// =============================================================================
// Events
// =============================================================================

/// Speaker of a transcript fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptRole {
    /// The caller
    User,
    /// The model
    Assistant,
}

impl fmt::Display for TranscriptRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// A semantic event decoded from the provider stream.
///
/// One provider message may expand into several events. They are delivered
/// in the order the relay must act on them: setup-complete, error,
/// interruption, audio, transcripts, turn-complete.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamEvent {
    /// The provider acknowledged the setup message
    SetupComplete,
    /// In-band error payload; not fatal on its own
    ProviderError {
        message: String,
        details: serde_json::Value,
    },
    /// The provider stopped in-progress model speech
    Interrupted,
    /// One decoded chunk of model audio
    Audio(Bytes),
    /// Transcript fragment for either side of the conversation
    Transcript { role: TranscriptRole, text: String },
    /// The model finished its turn
    TurnComplete,
    /// The provider closed the connection
    Closed { code: Option<u16>, reason: String },
    /// The connection failed at the transport level
    Failed(String),
}

// =============================================================================
// Link Traits
// =============================================================================

/// The sending half of an open upstream connection.
///
/// Owned exclusively by one relay session.
#[async_trait]
pub trait UpstreamLink: Send {
    /// Forward one chunk of caller audio.
    async fn send_audio(&mut self, chunk: Bytes) -> RealtimeResult<()>;

    /// Signal that the caller has stopped sending audio.
    async fn end_audio_stream(&mut self) -> RealtimeResult<()>;

    /// Close the connection with a normal closure code.
    async fn close(&mut self) -> RealtimeResult<()>;
}

/// An open upstream connection: the link to write to and the events it produces.
pub struct UpstreamHandle {
    pub link: Box<dyn UpstreamLink>,
    pub events: mpsc::Receiver<UpstreamEvent>,
}

impl fmt::Debug for UpstreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamHandle").finish_non_exhaustive()
    }
}

/// Opens upstream connections.
///
/// Implementations must send the provider's setup message immediately after
/// the connection opens. Each call is a single attempt; there is no retry.
#[async_trait]
pub trait UpstreamConnector: Send + Sync {
    async fn connect(&self, credential: &Credential) -> RealtimeResult<UpstreamHandle>;
}
