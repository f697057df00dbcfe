//! Merging environment variables with YAML overrides.

use super::ServerConfig;
use super::env::{env_bool, env_parse, env_string};
use super::yaml::YamlConfig;
use crate::core::auth::DEFAULT_OAUTH_SCOPE;
use crate::core::realtime::gemini::{
    DEFAULT_GEMINI_MODEL, DEFAULT_INPUT_SAMPLE_RATE, DEFAULT_PING_INTERVAL_SECS,
    DEFAULT_SYSTEM_INSTRUCTION, GEMINI_LIVE_URL,
};
use crate::relay::DEFAULT_PENDING_AUDIO_CHUNKS;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;

/// Build a [`ServerConfig`] from environment variables, then apply YAML overrides.
///
/// Priority (highest to lowest): YAML, environment (including `.env`), defaults.
pub(super) fn merge_config(
    yaml: Option<YamlConfig>,
) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let yaml = yaml.unwrap_or_default();
    let server = yaml.server.unwrap_or_default();
    let gemini = yaml.gemini.unwrap_or_default();
    let auth = yaml.auth.unwrap_or_default();
    let session = yaml.session.unwrap_or_default();
    let security = yaml.security.unwrap_or_default();

    let host = server
        .host
        .or_else(|| env_string("HOST"))
        .unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = match server.port {
        Some(port) => port,
        None => env_parse::<u16>("PORT")?.unwrap_or(DEFAULT_PORT),
    };

    let gemini_ws_url = gemini
        .url
        .or_else(|| env_string("GEMINI_WS_URL"))
        .unwrap_or_else(|| GEMINI_LIVE_URL.to_string());
    let gemini_model = gemini
        .model
        .or_else(|| env_string("GEMINI_MODEL"))
        .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());
    let system_instruction = gemini
        .system_instruction
        .or_else(|| env_string("GEMINI_SYSTEM_INSTRUCTION"))
        .unwrap_or_else(|| DEFAULT_SYSTEM_INSTRUCTION.to_string());
    let input_sample_rate = match gemini.input_sample_rate {
        Some(rate) => rate,
        None => env_parse::<u32>("INPUT_SAMPLE_RATE")?.unwrap_or(DEFAULT_INPUT_SAMPLE_RATE),
    };
    let enable_transcripts = match gemini.enable_transcripts {
        Some(enabled) => enabled,
        None => env_bool("ENABLE_TRANSCRIPTS")?.unwrap_or(false),
    };
    let upstream_ping_interval_seconds = match gemini.ping_interval_seconds {
        Some(secs) => secs,
        None => env_parse::<u64>("UPSTREAM_PING_INTERVAL_SECS")?
            .unwrap_or(DEFAULT_PING_INTERVAL_SECS),
    };

    let gemini_access_token = auth.access_token.or_else(|| env_string("GEMINI_ACCESS_TOKEN"));
    let gemini_api_key = auth.api_key.or_else(|| env_string("GEMINI_API_KEY"));
    let google_credentials = auth
        .service_account
        .or_else(|| env_string("GOOGLE_APPLICATION_CREDENTIALS"));
    let oauth_scope = auth
        .scope
        .or_else(|| env_string("GEMINI_OAUTH_SCOPE"))
        .unwrap_or_else(|| DEFAULT_OAUTH_SCOPE.to_string());
    let token_url = auth.token_url.or_else(|| env_string("GOOGLE_TOKEN_URL"));

    let pending_audio_chunks = match session.pending_audio_chunks {
        Some(chunks) => chunks,
        None => env_parse::<usize>("PENDING_AUDIO_CHUNKS")?.unwrap_or(DEFAULT_PENDING_AUDIO_CHUNKS),
    };
    let max_sessions = match session.max_sessions {
        Some(max) => Some(max),
        None => env_parse::<usize>("MAX_SESSIONS")?,
    };

    let cors_allowed_origins = security
        .cors_allowed_origins
        .or_else(|| env_string("CORS_ALLOWED_ORIGINS"));

    Ok(ServerConfig {
        host,
        port,
        gemini_ws_url,
        gemini_model,
        system_instruction,
        input_sample_rate,
        enable_transcripts,
        upstream_ping_interval_seconds,
        gemini_access_token,
        gemini_api_key,
        google_credentials,
        oauth_scope,
        token_url,
        pending_audio_chunks,
        max_sessions,
        cors_allowed_origins,
    })
}
