//! Relay sessions between browser clients and the upstream provider.
//!
//! # Architecture
//!
//! ```text
//! ┌────────┐  binary PCM / JSON  ┌──────────────┐  setup / audio / events  ┌──────────┐
//! │ Client │ <─────────────────> │ RelaySession │ <──────────────────────> │ Upstream │
//! └────────┘                     └──────────────┘                          └──────────┘
//!                                       ^
//!                                       │ one per connection
//!                                ┌──────────────┐
//!                                │ SessionRouter│
//!                                └──────────────┘
//! ```
//!
//! Caller audio that arrives before the provider reports setup-complete is
//! held in a bounded buffer and flushed in order once the session is ready.

use thiserror::Error;

use crate::core::auth::AuthError;
use crate::core::realtime::RealtimeError;

mod link;
mod messages;
mod pending;
mod router;
mod session;
mod state;

pub use link::{ClientLink, ClientLinkError};
pub use messages::{ClientFrame, RelayIncomingMessage, RelayOutgoingMessage};
pub use pending::{DEFAULT_PENDING_AUDIO_CHUNKS, PendingAudio};
pub use router::{CAPACITY_EXCEEDED_MESSAGE, SessionRouter};
pub use session::{CONNECTION_FAILED_MESSAGE, RelaySession, UPSTREAM_CLOSED_MESSAGE};
pub use state::SessionState;

/// Errors that end a relay session before it becomes ready.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No usable upstream credential
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The upstream connection could not be opened
    #[error(transparent)]
    Upstream(#[from] RealtimeError),
}
