use serde::Deserialize;
use std::path::PathBuf;

/// Complete YAML configuration structure
///
/// This structure represents the full configuration that can be loaded from a YAML file.
/// All fields are optional to allow partial configuration. Values present here
/// override environment variables.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 8080
///
/// gemini:
///   url: "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent"
///   model: "models/gemini-2.5-flash-native-audio-preview-12-2025"
///   system_instruction: "You are a friendly assistant."
///   input_sample_rate: 16000
///   enable_transcripts: false
///   ping_interval_seconds: 20
///
/// auth:
///   access_token: "ya29..."
///   api_key: "AIza..."
///   service_account: "/path/to/service-account.json"
///   scope: "https://www.googleapis.com/auth/generative-language"
///   token_url: "https://oauth2.googleapis.com/token"
///
/// session:
///   pending_audio_chunks: 10
///   max_sessions: 500
///
/// security:
///   cors_allowed_origins: "https://app.example.com"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub gemini: Option<GeminiYaml>,
    pub auth: Option<AuthYaml>,
    pub session: Option<SessionYaml>,
    pub security: Option<SecurityYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Upstream provider configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct GeminiYaml {
    pub url: Option<String>,
    pub model: Option<String>,
    pub system_instruction: Option<String>,
    pub input_sample_rate: Option<u32>,
    pub enable_transcripts: Option<bool>,
    /// Keepalive ping interval, 0 disables pings
    pub ping_interval_seconds: Option<u64>,
}

/// Upstream credentials from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AuthYaml {
    pub access_token: Option<String>,
    pub api_key: Option<String>,
    /// Service account key - can be:
    /// - Path to service account JSON file
    /// - Inline JSON content (for secrets management)
    pub service_account: Option<String>,
    pub scope: Option<String>,
    pub token_url: Option<String>,
}

/// Relay session limits from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SessionYaml {
    pub pending_audio_chunks: Option<usize>,
    pub max_sessions: Option<usize>,
}

/// Security configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SecurityYaml {
    pub cors_allowed_origins: Option<String>,
}

impl YamlConfig {
    /// Load configuration from a YAML file
    ///
    /// # Arguments
    /// * `path` - Path to the YAML configuration file
    ///
    /// # Errors
    /// Returns an error if:
    /// - The file cannot be read
    /// - The YAML is malformed
    /// - Fields have invalid types
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }
}
