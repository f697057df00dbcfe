use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use super::messages::RelayOutgoingMessage;

/// Errors writing to the client connection.
#[derive(Debug, Error)]
pub enum ClientLinkError {
    /// The connection is already closed
    #[error("Client link closed")]
    Closed,

    /// Transport failure
    #[error("Client send failed: {0}")]
    Send(String),

    /// The message could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// The writing half of a client connection.
///
/// A relay session is the sole writer and closer of its client link.
#[async_trait]
pub trait ClientLink: Send {
    /// Send a JSON control message as a text frame.
    async fn send_message(&mut self, message: RelayOutgoingMessage) -> Result<(), ClientLinkError>;

    /// Send provider audio as a binary frame.
    async fn send_audio(&mut self, chunk: Bytes) -> Result<(), ClientLinkError>;

    /// Close the connection with a normal closure code.
    async fn close(&mut self) -> Result<(), ClientLinkError>;
}
