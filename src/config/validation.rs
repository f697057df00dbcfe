//! Configuration validation logic.

use super::ServerConfig;

/// Validate a fully merged configuration.
pub(super) fn validate(config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    if config.port == 0 {
        return Err("PORT must be greater than 0".into());
    }

    if config.pending_audio_chunks == 0 {
        return Err("PENDING_AUDIO_CHUNKS must be at least 1".into());
    }

    if config.input_sample_rate == 0 {
        return Err("INPUT_SAMPLE_RATE must be greater than 0".into());
    }

    if config.max_sessions == Some(0) {
        return Err("MAX_SESSIONS must be at least 1 when set".into());
    }

    validate_upstream_url(&config.gemini_ws_url)?;

    Ok(())
}

/// The upstream endpoint must be a ws:// or wss:// URL.
fn validate_upstream_url(raw: &str) -> Result<(), Box<dyn std::error::Error>> {
    let url = url::Url::parse(raw).map_err(|e| format!("Invalid GEMINI_WS_URL '{raw}': {e}"))?;

    match url.scheme() {
        "ws" | "wss" => Ok(()),
        scheme => Err(format!("GEMINI_WS_URL must use ws:// or wss://, got {scheme}://").into()),
    }
}
