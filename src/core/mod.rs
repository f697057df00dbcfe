pub mod auth;
pub mod realtime;

pub use auth::{AuthError, AuthResult, Credential, CredentialProvider};
pub use realtime::{
    GeminiConfig, GeminiConnector, RealtimeError, RealtimeResult, UpstreamConnector,
    UpstreamEvent, UpstreamLink,
};
