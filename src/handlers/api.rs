/// Service banner for `GET /`
pub async fn root() -> &'static str {
    "Voice Relay Gateway"
}

/// Liveness probe for `GET /health`
pub async fn health_check() -> &'static str {
    "ok"
}
