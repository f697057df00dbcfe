//! HTTP and WebSocket request handlers
//!
//! - `api` - Banner and health check endpoints
//! - `relay` - Client audio relay WebSocket

pub mod api;
pub mod relay;

pub use relay::{relay_handler, relay_session_handler};
