use std::sync::Arc;

use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::core::auth::{AuthResult, CredentialProvider};
use crate::core::realtime::{GeminiConfig, GeminiConnector, UpstreamConnector};
use crate::relay::SessionRouter;

/// Application state shared by all handlers
pub struct AppState {
    pub config: ServerConfig,
    pub router: SessionRouter,
}

impl AppState {
    /// Build the state from configuration: credential provider, Gemini connector and router.
    ///
    /// # Errors
    /// Fails if a configured service account key cannot be loaded. Missing
    /// credentials are not an error here; each session reports them instead.
    pub fn new(config: ServerConfig) -> AuthResult<Arc<Self>> {
        let credentials = CredentialProvider::from_config(&config)?;
        if !credentials.is_configured() {
            warn!(
                "No upstream credentials configured; client sessions will fail until \
                 GEMINI_ACCESS_TOKEN, GEMINI_API_KEY or GOOGLE_APPLICATION_CREDENTIALS is set"
            );
        }

        let gemini = GeminiConfig::from_server_config(&config);
        info!(model = %gemini.model, url = %gemini.url, "Configured Gemini Live upstream");

        Ok(Self::with_components(
            config,
            Arc::new(credentials),
            Arc::new(GeminiConnector::new(gemini)),
        ))
    }

    /// Build the state around an explicit credential provider and connector.
    pub fn with_components(
        config: ServerConfig,
        credentials: Arc<CredentialProvider>,
        connector: Arc<dyn UpstreamConnector>,
    ) -> Arc<Self> {
        let router = SessionRouter::new(
            credentials,
            connector,
            config.pending_audio_chunks,
            config.max_sessions,
        );
        Arc::new(Self { config, router })
    }
}
