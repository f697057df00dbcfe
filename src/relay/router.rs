use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use dashmap::DashMap;
use futures::Stream;
use tokio::task::JoinHandle;
use tracing::{Instrument, info, info_span, warn};

use super::link::ClientLink;
use super::messages::{ClientFrame, RelayOutgoingMessage};
use super::session::RelaySession;
use crate::core::auth::CredentialProvider;
use crate::core::realtime::UpstreamConnector;

/// Message sent to a client refused because the session limit is reached.
pub const CAPACITY_EXCEEDED_MESSAGE: &str = "Too many active sessions";

/// Accepts client connections and spawns one independent relay session per connection.
///
/// Sessions share only the credential provider and the upstream connector.
/// Client-supplied identifiers are labels: two connections with the same
/// identifier get two unrelated sessions.
pub struct SessionRouter {
    credentials: Arc<CredentialProvider>,
    connector: Arc<dyn UpstreamConnector>,
    pending_audio_chunks: usize,
    max_sessions: Option<usize>,
    active: Arc<AtomicUsize>,
    next_key: AtomicU64,
    live: Arc<DashMap<u64, String>>,
}

impl SessionRouter {
    pub fn new(
        credentials: Arc<CredentialProvider>,
        connector: Arc<dyn UpstreamConnector>,
        pending_audio_chunks: usize,
        max_sessions: Option<usize>,
    ) -> Self {
        Self {
            credentials,
            connector,
            pending_audio_chunks,
            max_sessions,
            active: Arc::new(AtomicUsize::new(0)),
            next_key: AtomicU64::new(0),
            live: Arc::new(DashMap::new()),
        }
    }

    /// Number of sessions currently running.
    pub fn active_sessions(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Number of running sessions labelled with `session_id`.
    pub fn sessions_for(&self, session_id: &str) -> usize {
        self.live
            .iter()
            .filter(|entry| entry.value() == session_id)
            .count()
    }

    /// Start a relay session for a freshly accepted client connection.
    ///
    /// Returns the handle of the task driving the session. If the session
    /// limit is reached the client receives one `error` message and a
    /// normal close, and the returned task does nothing else.
    pub fn route<S>(&self, session_id: String, mut client: Box<dyn ClientLink>, frames: S) -> JoinHandle<()>
    where
        S: Stream<Item = ClientFrame> + Send + 'static,
    {
        let Some(slot) = self.reserve_slot() else {
            warn!(
                session_id = %session_id,
                limit = ?self.max_sessions,
                "Rejecting client connection: session limit reached"
            );
            return tokio::spawn(async move {
                let _ = client
                    .send_message(RelayOutgoingMessage::error(CAPACITY_EXCEEDED_MESSAGE))
                    .await;
                let _ = client.close().await;
            });
        };

        let key = self.next_key.fetch_add(1, Ordering::Relaxed);
        self.live.insert(key, session_id.clone());
        let guard = SessionGuard {
            key,
            live: Arc::clone(&self.live),
            _slot: slot,
        };

        let mut session = RelaySession::new(
            session_id.clone(),
            client,
            Arc::clone(&self.credentials),
            Arc::clone(&self.connector),
            self.pending_audio_chunks,
        );

        let span = info_span!("relay_session", session_id = %session_id);
        tokio::spawn(
            async move {
                info!("Relay session started");
                session.run(frames).await;
                drop(guard);
            }
            .instrument(span),
        )
    }

    fn reserve_slot(&self) -> Option<SessionSlot> {
        let limit = self.max_sessions.unwrap_or(usize::MAX);
        self.active
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                (current < limit).then_some(current + 1)
            })
            .ok()
            .map(|_| SessionSlot {
                active: Arc::clone(&self.active),
            })
    }
}

struct SessionSlot {
    active: Arc<AtomicUsize>,
}

impl Drop for SessionSlot {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

struct SessionGuard {
    key: u64,
    live: Arc<DashMap<u64, String>>,
    _slot: SessionSlot,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.live.remove(&self.key);
    }
}
