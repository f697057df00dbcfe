pub mod config;
pub mod core;
pub mod handlers;
pub mod relay;
pub mod routes;
pub mod state;

// Re-export commonly used items for convenience
pub use config::ServerConfig;
pub use crate::core::*;
pub use relay::{RelaySession, SessionRouter};
pub use state::AppState;
