//! Gemini Live API configuration types.
//!
//! This module contains the connection settings for the Gemini Live
//! `BidiGenerateContent` endpoint:
//! - Endpoint and model selection
//! - Persona (system instruction)
//! - Audio format configuration
//! - Keepalive settings

use std::time::Duration;

use crate::config::ServerConfig;

/// Gemini Live API WebSocket endpoint.
pub const GEMINI_LIVE_URL: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

/// Default native-audio model.
pub const DEFAULT_GEMINI_MODEL: &str = "models/gemini-2.5-flash-native-audio-preview-12-2025";

/// Default persona sent as the system instruction.
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "A warm, rounded, and friendly male cartoon voice. The character sounds like a chubby, honest piggy. \
The tone is soft, slightly deep but very cute, not scary. The speaking pace is relaxed and slightly slow, \
giving a feeling of being thoughtful and trustworthy. It has a tiny bit of nasal resonance (to hint at \
being a pig) but remains very clear and pleasant to listen to. Think of a mix between Winnie the Pooh and \
Baymax. It sounds optimistic, patient, and soothing for children. Please respond to the child.";

/// Sample rate of caller audio sent upstream.
pub const DEFAULT_INPUT_SAMPLE_RATE: u32 = 16000;

/// Default interval between keepalive pings on the upstream socket.
pub const DEFAULT_PING_INTERVAL_SECS: u64 = 20;

/// Requested response modality.
pub const RESPONSE_MODALITY_AUDIO: &str = "AUDIO";

/// Activity handling policy: new caller speech interrupts model speech.
pub const START_OF_ACTIVITY_INTERRUPTS: &str = "START_OF_ACTIVITY_INTERRUPTS";

/// Header carrying a static API key.
pub const API_KEY_HEADER: &str = "x-goog-api-key";

/// Connection settings for [`super::GeminiConnector`].
#[derive(Debug, Clone, PartialEq)]
pub struct GeminiConfig {
    /// WebSocket endpoint
    pub url: String,
    /// Model resource name (e.g. `models/gemini-2.5-flash-native-audio-preview-12-2025`)
    pub model: String,
    /// Persona text sent as the system instruction
    pub system_instruction: String,
    /// Sample rate declared in the audio MIME tag
    pub input_sample_rate: u32,
    /// Request input and output transcription
    pub enable_transcripts: bool,
    /// Keepalive ping interval; `None` disables pings
    pub ping_interval: Option<Duration>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            url: GEMINI_LIVE_URL.to_string(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
            input_sample_rate: DEFAULT_INPUT_SAMPLE_RATE,
            enable_transcripts: false,
            ping_interval: Some(Duration::from_secs(DEFAULT_PING_INTERVAL_SECS)),
        }
    }
}

impl GeminiConfig {
    /// Build the connector settings from server configuration.
    pub fn from_server_config(config: &ServerConfig) -> Self {
        Self {
            url: config.gemini_ws_url.clone(),
            model: config.gemini_model.clone(),
            system_instruction: config.system_instruction.clone(),
            input_sample_rate: config.input_sample_rate,
            enable_transcripts: config.enable_transcripts,
            ping_interval: (config.upstream_ping_interval_seconds > 0)
                .then(|| Duration::from_secs(config.upstream_ping_interval_seconds)),
        }
    }

    /// MIME tag for caller audio chunks.
    #[inline]
    pub fn input_mime_type(&self) -> String {
        format!("audio/pcm;rate={}", self.input_sample_rate)
    }
}
