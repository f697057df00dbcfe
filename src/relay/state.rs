use std::fmt;

/// Lifecycle of a relay session.
///
/// `Connecting → Handshaking → Ready → Running → Closing → Closed`.
/// `Ready` only marks the instant the pending audio is flushed; it is
/// otherwise the same operating mode as `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Client accepted, nothing started yet
    #[default]
    Connecting,
    /// Credential and upstream connection in progress, waiting for setup-complete
    Handshaking,
    /// Setup-complete received, pending audio being flushed
    Ready,
    /// Audio flows in both directions
    Running,
    /// Teardown in progress
    Closing,
    /// Both links closed
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => write!(f, "connecting"),
            Self::Handshaking => write!(f, "handshaking"),
            Self::Ready => write!(f, "ready"),
            Self::Running => write!(f, "running"),
            Self::Closing => write!(f, "closing"),
            Self::Closed => write!(f, "closed"),
        }
    }
}
