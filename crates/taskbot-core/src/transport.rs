use async_trait::async_trait;

use crate::events::Keyboard;
use crate::ids::ChatId;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("chat API error: {0}")]
    Api(String),
}

/// Outbound side of the chat boundary. Implementations own retries and
/// wire formatting; callers treat every method as best-effort.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send a new message, optionally attaching a keyboard.
    async fn send(
        &self,
        chat: ChatId,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<(), TransportError>;

    /// Replace the text of an existing message (drops its inline keyboard).
    async fn edit(&self, chat: ChatId, message_id: i64, text: &str) -> Result<(), TransportError>;

    /// Acknowledge an inline button press so the client stops its spinner.
    async fn ack(&self, callback_id: &str) -> Result<(), TransportError>;
}
