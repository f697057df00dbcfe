use std::collections::VecDeque;

use bytes::Bytes;

/// Default number of audio chunks held while the provider handshake is in flight.
pub const DEFAULT_PENDING_AUDIO_CHUNKS: usize = 10;

/// Bounded FIFO of caller audio captured before the session is ready.
///
/// Chunks beyond capacity are dropped: the earliest chunks are kept.
#[derive(Debug)]
pub struct PendingAudio {
    chunks: VecDeque<Bytes>,
    capacity: usize,
    dropped: usize,
}

impl PendingAudio {
    pub fn new(capacity: usize) -> Self {
        Self {
            chunks: VecDeque::with_capacity(capacity),
            capacity,
            dropped: 0,
        }
    }

    /// Queue a chunk. Returns `false` if the buffer is full and the chunk was dropped.
    pub fn push(&mut self, chunk: Bytes) -> bool {
        if self.chunks.len() >= self.capacity {
            self.dropped += 1;
            return false;
        }
        self.chunks.push_back(chunk);
        true
    }

    /// Remove all queued chunks in arrival order.
    pub fn drain(&mut self) -> impl Iterator<Item = Bytes> + '_ {
        self.chunks.drain(..)
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Chunks dropped for lack of space over the buffer's lifetime.
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

impl Default for PendingAudio {
    fn default() -> Self {
        Self::new(DEFAULT_PENDING_AUDIO_CHUNKS)
    }
}
