//! Gemini Live API message types.
//!
//! This module defines the JSON envelopes exchanged on the
//! `BidiGenerateContent` WebSocket.
//!
//! # Client Messages
//!
//! - `setup` - Sent once, immediately after the socket opens
//! - `realtimeInput` - Caller audio chunks and the end-of-stream marker
//!
//! # Server Messages
//!
//! - `setupComplete` - Setup acknowledged, audio may flow
//! - `serverContent` - Model audio, interruption, transcripts, turn completion
//! - `error` / `rpcStatus` - In-band error payloads

use base64::prelude::*;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::config::{GeminiConfig, RESPONSE_MODALITY_AUDIO, START_OF_ACTIVITY_INTERRUPTS};
use crate::core::realtime::base::{RealtimeError, RealtimeResult, TranscriptRole, UpstreamEvent};

/// Client-facing message used for in-band provider errors.
pub const PROVIDER_ERROR_MESSAGE: &str = "Gemini error";

// =============================================================================
// Client Messages
// =============================================================================

/// Messages sent to the Gemini Live API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ClientMessage {
    /// Session setup
    Setup(Setup),
    /// Realtime caller input
    RealtimeInput(RealtimeInput),
}

/// Session setup declaring model, persona, output modality and barge-in policy.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Setup {
    /// Model resource name
    pub model: String,

    /// Generation settings
    pub generation_config: GenerationConfig,

    /// Persona / system instruction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,

    /// Realtime input handling
    pub realtime_input_config: RealtimeInputConfig,

    /// Request caller transcription
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_transcription: Option<AudioTranscriptionConfig>,

    /// Request model transcription
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_audio_transcription: Option<AudioTranscriptionConfig>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Content {
    pub parts: Vec<TextPart>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextPart {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInputConfig {
    pub activity_handling: String,
}

/// Empty marker object enabling transcription.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AudioTranscriptionConfig {}

/// Realtime input: either an audio chunk or the end-of-stream marker.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    /// Base64 audio chunk
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<Blob>,

    /// Caller stopped sending audio
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_stream_end: Option<bool>,
}

/// Inline binary payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    pub data: String,
}

impl ClientMessage {
    /// Build the setup message for a new session.
    pub fn setup(config: &GeminiConfig) -> Self {
        let system_instruction = (!config.system_instruction.is_empty()).then(|| Content {
            parts: vec![TextPart {
                text: config.system_instruction.clone(),
            }],
        });
        let transcription = config
            .enable_transcripts
            .then(AudioTranscriptionConfig::default);

        Self::Setup(Setup {
            model: config.model.clone(),
            generation_config: GenerationConfig {
                response_modalities: vec![RESPONSE_MODALITY_AUDIO.to_string()],
            },
            system_instruction,
            realtime_input_config: RealtimeInputConfig {
                activity_handling: START_OF_ACTIVITY_INTERRUPTS.to_string(),
            },
            input_audio_transcription: transcription.clone(),
            output_audio_transcription: transcription,
        })
    }

    /// Wrap raw PCM in a base64 realtime audio envelope.
    pub fn audio(chunk: &[u8], mime_type: &str) -> Self {
        Self::RealtimeInput(RealtimeInput {
            audio: Some(Blob {
                mime_type: mime_type.to_string(),
                data: BASE64_STANDARD.encode(chunk),
            }),
            audio_stream_end: None,
        })
    }

    /// End-of-audio-stream marker.
    pub fn audio_stream_end() -> Self {
        Self::RealtimeInput(RealtimeInput {
            audio: None,
            audio_stream_end: Some(true),
        })
    }
}

// =============================================================================
// Server Messages
// =============================================================================

/// Messages received from the Gemini Live API.
///
/// Every field is optional; unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    #[serde(default)]
    pub setup_complete: Option<serde_json::Value>,
    #[serde(default)]
    pub server_content: Option<ServerContent>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
    #[serde(default)]
    pub rpc_status: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    #[serde(default)]
    pub model_turn: Option<ModelTurn>,
    #[serde(default)]
    pub interrupted: Option<bool>,
    #[serde(default)]
    pub turn_complete: Option<bool>,
    #[serde(default)]
    pub input_transcription: Option<Transcription>,
    #[serde(default)]
    pub output_transcription: Option<Transcription>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelTurn {
    #[serde(default)]
    pub parts: Vec<ServerPart>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerPart {
    #[serde(default, alias = "inline_data")]
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Transcription {
    #[serde(default)]
    pub text: Option<String>,
}

impl ServerMessage {
    /// Parse a raw frame, text or binary.
    pub fn parse(raw: &[u8]) -> RealtimeResult<Self> {
        serde_json::from_slice::<ServerMessage>(raw)
            .map_err(|e| RealtimeError::ProtocolError(format!("malformed Gemini message: {e}")))
    }

    /// Expand this message into relay events, in handling order.
    pub fn into_events(self) -> Vec<UpstreamEvent> {
        let mut events = Vec::new();

        if self.setup_complete.is_some_and(|value| !value.is_null()) {
            events.push(UpstreamEvent::SetupComplete);
        }

        if let Some(details) = self
            .error
            .filter(is_present)
            .or_else(|| self.rpc_status.filter(is_present))
        {
            events.push(UpstreamEvent::ProviderError {
                message: PROVIDER_ERROR_MESSAGE.to_string(),
                details,
            });
        }

        let Some(content) = self.server_content else {
            return events;
        };

        if content.interrupted == Some(true) {
            events.push(UpstreamEvent::Interrupted);
        }

        let parts = content.model_turn.map(|turn| turn.parts).unwrap_or_default();
        for part in parts {
            let Some(data) = part.inline_data.and_then(|inline| inline.data) else {
                continue;
            };
            if data.is_empty() {
                continue;
            }
            match BASE64_STANDARD.decode(data.as_bytes()) {
                Ok(audio) => events.push(UpstreamEvent::Audio(Bytes::from(audio))),
                Err(e) => debug!("Skipping undecodable audio part: {}", e),
            }
        }

        for (role, transcription) in [
            (TranscriptRole::User, content.input_transcription),
            (TranscriptRole::Assistant, content.output_transcription),
        ] {
            if let Some(text) = transcription
                .and_then(|t| t.text)
                .filter(|text| !text.is_empty())
            {
                events.push(UpstreamEvent::Transcript { role, text });
            }
        }

        if content.turn_complete == Some(true) {
            events.push(UpstreamEvent::TurnComplete);
        }

        events
    }
}

/// Error payloads count only when they carry something.
fn is_present(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null | serde_json::Value::Bool(false) => false,
        serde_json::Value::String(s) => !s.is_empty(),
        serde_json::Value::Object(map) => !map.is_empty(),
        serde_json::Value::Array(items) => !items.is_empty(),
        _ => true,
    }
}
