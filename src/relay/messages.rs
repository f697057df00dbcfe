//! Client WebSocket message types
//!
//! The client protocol is deliberately small:
//!
//! - Binary frames carry PCM 16-bit little-endian audio in both directions
//! - Text frames carry JSON control messages tagged by `type`

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::realtime::TranscriptRole;

// =============================================================================
// Incoming Messages (Client -> Server)
// =============================================================================

/// Control messages a client may send
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum RelayIncomingMessage {
    /// End the conversation
    #[serde(rename = "stop")]
    Stop,
}

/// One decoded frame from the client connection
#[derive(Debug, Clone, PartialEq)]
pub enum ClientFrame {
    /// Caller audio
    Audio(Bytes),
    /// A recognized control message
    Control(RelayIncomingMessage),
    /// The client connection closed or failed
    Closed,
}

impl ClientFrame {
    /// Decode a text frame. Unknown or malformed JSON yields `None`.
    pub fn from_text(text: &str) -> Option<Self> {
        match serde_json::from_str::<RelayIncomingMessage>(text) {
            Ok(message) => Some(Self::Control(message)),
            Err(e) => {
                debug!("Ignoring unrecognized client message: {}", e);
                None
            }
        }
    }
}

// =============================================================================
// Outgoing Messages (Server -> Client)
// =============================================================================

/// Control messages sent to the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RelayOutgoingMessage {
    /// The provider accepted the session; audio now flows immediately
    #[serde(rename = "ready")]
    Ready,

    /// The provider stopped model speech; the client should drop queued playback
    #[serde(rename = "interrupted")]
    Interrupted,

    /// The model finished its turn
    #[serde(rename = "turn_complete")]
    TurnComplete,

    /// Something went wrong
    #[serde(rename = "error")]
    Error {
        /// Human-readable message
        message: String,
        /// Raw diagnostic payload
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<serde_json::Value>,
    },

    /// Transcript fragment
    #[serde(rename = "transcript")]
    Transcript {
        /// Who spoke
        role: TranscriptRole,
        /// Transcribed text
        text: String,
    },
}

impl RelayOutgoingMessage {
    /// Error message without details.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            details: None,
        }
    }
}
