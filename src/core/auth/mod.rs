//! Upstream provider credentials.
//!
//! The gateway authenticates to the realtime provider with one of three
//! credential kinds, chosen from configuration in this order:
//!
//! 1. A static bearer token (`GEMINI_ACCESS_TOKEN`)
//! 2. A static API key (`GEMINI_API_KEY`)
//! 3. A service account key, exchanged for a short-lived bearer token through
//!    the OAuth2 JWT-bearer grant
//!
//! Exchanged tokens are cached process-wide inside [`CredentialProvider`] and
//! shared by every relay session.
//!
//! # Example
//!
//! ```rust,no_run
//! use voice_relay_gateway::ServerConfig;
//! use voice_relay_gateway::core::auth::CredentialProvider;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig::from_env()?;
//! let provider = CredentialProvider::from_config(&config)?;
//! let credential = provider.get_credential().await?;
//! println!("using {} credential", credential.kind());
//! # Ok(())
//! # }
//! ```

mod credentials;
mod exchange;
mod provider;

use thiserror::Error;

pub use credentials::{Credential, CredentialSource, ServiceAccountKey};
pub use exchange::{
    AccessToken, DEFAULT_TOKEN_LIFETIME_SECS, JWT_BEARER_GRANT_TYPE, ServiceAccountExchange,
    TokenExchange,
};
pub use provider::{Clock, CredentialProvider, REFRESH_MARGIN_SECS, SystemClock};

/// Default OAuth2 scope requested for the Generative Language API.
pub const DEFAULT_OAUTH_SCOPE: &str = "https://www.googleapis.com/auth/generative-language";

/// Google OAuth2 token endpoint.
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Errors raised while resolving an upstream credential.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Neither a static credential nor a service account is configured
    #[error(
        "No upstream credentials configured: set GEMINI_ACCESS_TOKEN, GEMINI_API_KEY or GOOGLE_APPLICATION_CREDENTIALS"
    )]
    MissingCredentials,

    /// The configured service account key cannot be loaded or used for signing
    #[error("Invalid service account credentials: {0}")]
    InvalidServiceAccount(String),

    /// The token endpoint did not return a usable access token
    #[error("Token exchange failed: {0}")]
    TokenExchange(String),
}

/// Result type for credential operations.
pub type AuthResult<T> = Result<T, AuthError>;
