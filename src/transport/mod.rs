use async_trait::async_trait;
use teloxide::types::{ChatId, MessageId, UserId};
use thiserror::Error;

use crate::domain::MemberRole;

#[cfg(test)]
pub mod fake;
pub mod telegram;

pub use telegram::TelegramTransport;

pub type TransportResult<T> = Result<T, TransportError>;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("telegram request failed: {0}")]
    Request(#[from] teloxide::RequestError),
    #[error("message not found")]
    NotFound,
    #[error("request rejected: {0}")]
    Rejected(String),
}

/// Outbound calls the schedulers make against the chat platform.
///
/// Failures are returned, never panicked on; the schedulers decide which ones
/// to swallow.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> TransportResult<MessageId>;

    async fn copy_message(
        &self,
        chat_id: ChatId,
        source_chat_id: ChatId,
        source_message_id: MessageId,
    ) -> TransportResult<MessageId>;

    /// `TransportError::NotFound` means the message is already gone.
    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> TransportResult<()>;

    async fn member_role(&self, chat_id: ChatId, user_id: UserId) -> TransportResult<MemberRole>;
}
