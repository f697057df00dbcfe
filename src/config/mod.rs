//! Configuration module for the voice relay gateway
//!
//! This module handles server configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable readers
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//!
//! # Example
//! ```rust,no_run
//! use voice_relay_gateway::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;

mod env;
mod merge;
mod validation;
mod yaml;

pub use yaml::YamlConfig;

/// Server configuration
///
/// Contains all configuration needed to run the gateway, including:
/// - Server settings (host, port)
/// - Upstream provider settings (endpoint, model, persona, audio format)
/// - Upstream credentials (static token, API key, or service account)
/// - Relay session limits
/// - Security settings (CORS)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // Upstream provider settings
    /// Gemini Live WebSocket endpoint
    pub gemini_ws_url: String,
    /// Model resource name sent in the setup message
    pub gemini_model: String,
    /// Persona text sent as the system instruction
    pub system_instruction: String,
    /// Sample rate of caller PCM audio (declared in the upstream MIME tag)
    pub input_sample_rate: u32,
    /// Ask the provider for transcripts and relay them to clients
    pub enable_transcripts: bool,
    /// Upstream keepalive ping interval in seconds, 0 disables pings
    pub upstream_ping_interval_seconds: u64,

    // Upstream credentials
    /// Static bearer token; takes precedence over every other credential
    pub gemini_access_token: Option<String>,
    /// Static API key, sent as `x-goog-api-key`
    pub gemini_api_key: Option<String>,
    /// Google service account credentials - can be:
    /// - JSON string starting with '{': Service account credentials inline
    /// - File path: Path to service account JSON file
    pub google_credentials: Option<String>,
    /// OAuth2 scope requested in the service account assertion
    pub oauth_scope: String,
    /// OAuth2 token endpoint for the JWT-bearer exchange. When unset the
    /// key file's `token_uri` is used, then Google's default endpoint.
    pub token_url: Option<String>,

    // Relay session settings
    /// Audio chunks buffered per session before the provider is ready
    /// Default: 10
    pub pending_audio_chunks: usize,
    /// Maximum concurrent relay sessions
    /// Default: None (unlimited)
    pub max_sessions: Option<usize>,

    // Security configuration
    /// CORS allowed origins (comma-separated list or "*" for all)
    /// Default: None (CORS disabled, same-origin only)
    pub cors_allowed_origins: Option<String>,
}

/// Implement Drop to zeroize all secret fields when ServerConfig is dropped.
/// This ensures sensitive data is cleared from memory immediately after use.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut token) = self.gemini_access_token {
            token.zeroize();
        }
        if let Some(ref mut key) = self.gemini_api_key {
            key.zeroize();
        }
        if let Some(ref mut creds) = self.google_credentials {
            creds.zeroize();
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// The `.env` file is loaded by `main` before this is called, so values from
    /// it are visible here as ordinary environment variables.
    ///
    /// # Errors
    /// Returns an error if a variable has an invalid format or validation fails.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let config = merge::merge_config(None)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// After loading and merging, performs validation on the final configuration.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        let config = merge::merge_config(Some(yaml_config))?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Get the server address as a string
    ///
    /// Returns the address in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if any upstream credential is configured
    pub fn has_upstream_credentials(&self) -> bool {
        [
            &self.gemini_access_token,
            &self.gemini_api_key,
            &self.google_credentials,
        ]
        .iter()
        .any(|value| value.as_deref().is_some_and(|v| !v.trim().is_empty()))
    }
}
