use std::fmt;
use std::path::Path;

use serde::Deserialize;
use zeroize::Zeroize;

use super::{AuthError, AuthResult, GOOGLE_TOKEN_URL};
use crate::config::ServerConfig;

/// A credential attached to the upstream connection request.
///
/// The two kinds are mutually exclusive: a bearer token goes into the
/// `Authorization` header, an API key into `x-goog-api-key`.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// Static API key
    ApiKey(String),
    /// OAuth2 bearer token (static or exchanged)
    Bearer(String),
}

impl Credential {
    /// Short label for logs. Never includes the secret.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ApiKey(_) => "api_key",
            Self::Bearer(_) => "bearer",
        }
    }

}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential::{}(<redacted>)", self.kind())
    }
}

impl Drop for Credential {
    fn drop(&mut self) {
        match self {
            Self::ApiKey(value) | Self::Bearer(value) => value.zeroize(),
        }
    }
}

/// The subset of a Google service account JSON key needed for the JWT-bearer grant.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    /// Service account email, used as the assertion issuer
    pub client_email: String,
    /// PEM encoded RSA private key
    pub private_key: String,
    /// Token endpoint declared by the key file
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl ServiceAccountKey {
    /// Parse a service account key from its JSON representation.
    pub fn from_json(json: &str) -> AuthResult<Self> {
        let key: ServiceAccountKey = serde_json::from_str(json)
            .map_err(|e| AuthError::InvalidServiceAccount(format!("malformed key JSON: {e}")))?;

        if key.client_email.is_empty() {
            return Err(AuthError::InvalidServiceAccount(
                "client_email is empty".to_string(),
            ));
        }
        if !key.private_key.contains("PRIVATE KEY") {
            return Err(AuthError::InvalidServiceAccount(
                "private_key is not a PEM encoded key".to_string(),
            ));
        }

        Ok(key)
    }

    /// Load a key from either inline JSON or a path to a JSON file.
    pub fn load(value: &str) -> AuthResult<Self> {
        let trimmed = value.trim();
        if trimmed.starts_with('{') {
            return Self::from_json(trimmed);
        }

        let path = Path::new(trimmed);
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AuthError::InvalidServiceAccount(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&contents)
    }

    /// Token endpoint for the exchange: an explicit override, else the key
    /// file's `token_uri`, else Google's default endpoint.
    pub fn token_endpoint(&self, configured: Option<&str>) -> String {
        configured
            .or(self.token_uri.as_deref())
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .unwrap_or(GOOGLE_TOKEN_URL)
            .to_string()
    }
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl Drop for ServiceAccountKey {
    fn drop(&mut self) {
        self.private_key.zeroize();
    }
}

/// Where credentials come from, resolved once from configuration.
#[derive(Debug, Clone)]
pub enum CredentialSource {
    /// Fixed bearer token, returned as-is
    StaticToken(String),
    /// Fixed API key, returned as-is
    ApiKey(String),
    /// Service account key exchanged for short-lived bearer tokens
    ServiceAccount(ServiceAccountKey),
    /// Nothing configured; every request fails with [`AuthError::MissingCredentials`]
    Unconfigured,
}

impl CredentialSource {
    /// Resolve the credential source from server configuration.
    ///
    /// A static access token wins over an API key, which wins over a service
    /// account. Empty strings count as unset.
    pub fn from_config(config: &ServerConfig) -> AuthResult<Self> {
        if let Some(token) = non_empty(&config.gemini_access_token) {
            return Ok(Self::StaticToken(token.to_string()));
        }
        if let Some(key) = non_empty(&config.gemini_api_key) {
            return Ok(Self::ApiKey(key.to_string()));
        }
        if let Some(credentials) = non_empty(&config.google_credentials) {
            return ServiceAccountKey::load(credentials).map(Self::ServiceAccount);
        }
        Ok(Self::Unconfigured)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
