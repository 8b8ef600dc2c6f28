//! Transport traits for implementing chat backends.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::message::ChatEvent;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Transport error type.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Message send failed: {0}")]
    SendFailed(String),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Transport not ready")]
    NotReady,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A chat backend.
///
/// Sends are one line per call. `listen` runs until the connection ends and
/// pushes everything it hears into `tx`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Transport name, for logs.
    fn name(&self) -> &str;

    /// The nick the bot currently goes by.
    fn nickname(&self) -> String;

    /// Say a line in a channel.
    async fn send_public(&self, channel: &str, line: &str) -> TransportResult<()>;

    /// Say a line to one user.
    async fn send_private(&self, nick: &str, line: &str) -> TransportResult<()>;

    async fn join(&self, channel: &str) -> TransportResult<()>;

    async fn part(&self, channel: &str) -> TransportResult<()>;

    async fn set_topic(&self, channel: &str, topic: &str) -> TransportResult<()>;

    /// Whether `nick` holds operator status in `channel`, answered from what
    /// the transport has already seen.
    fn is_operator(&self, channel: &str, nick: &str) -> bool;

    /// Read events until the connection ends.
    async fn listen(&self, tx: mpsc::Sender<ChatEvent>) -> TransportResult<()>;

    /// Whether a listener that returned should be started again.
    fn reconnects(&self) -> bool {
        true
    }

    /// Leave the network with a parting message.
    async fn shutdown(&self, reason: &str) -> TransportResult<()>;
}

/// Anything that can answer operator queries.
///
/// The dispatcher only needs this much of a transport.
pub trait OperatorCheck {
    fn is_channel_operator(&self, channel: &str, nick: &str) -> bool;
}

impl<T: Transport + ?Sized> OperatorCheck for T {
    fn is_channel_operator(&self, channel: &str, nick: &str) -> bool {
        Transport::is_operator(self, channel, nick)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages() {
        assert_eq!(TransportError::NotReady.to_string(), "Transport not ready");
        assert_eq!(
            TransportError::SendFailed("closed".into()).to_string(),
            "Message send failed: closed"
        );
    }
}
