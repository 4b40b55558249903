use async_trait::async_trait;
use teloxide::{
    prelude::*,
    types::{ChatId, ChatMemberStatus, MessageId, UserId},
    ApiError, RequestError,
};

use super::{Transport, TransportError, TransportResult};
use crate::domain::MemberRole;

#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn map_delete_err(err: RequestError) -> TransportError {
        match err {
            RequestError::Api(ApiError::MessageToDeleteNotFound) => TransportError::NotFound,
            other => TransportError::Request(other),
        }
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> TransportResult<MessageId> {
        let sent = self.bot.send_message(chat_id, text.to_string()).await?;
        Ok(sent.id)
    }

    async fn copy_message(
        &self,
        chat_id: ChatId,
        source_chat_id: ChatId,
        source_message_id: MessageId,
    ) -> TransportResult<MessageId> {
        let copied = self
            .bot
            .copy_message(chat_id, source_chat_id, source_message_id)
            .await?;
        Ok(copied)
    }

    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> TransportResult<()> {
        self.bot
            .delete_message(chat_id, message_id)
            .await
            .map_err(Self::map_delete_err)?;
        Ok(())
    }

    async fn member_role(&self, chat_id: ChatId, user_id: UserId) -> TransportResult<MemberRole> {
        let member = self.bot.get_chat_member(chat_id, user_id).await?;
        let role = match member.status() {
            ChatMemberStatus::Owner => MemberRole::Creator,
            ChatMemberStatus::Administrator => MemberRole::Administrator,
            ChatMemberStatus::Member => MemberRole::Member,
            ChatMemberStatus::Restricted => MemberRole::Restricted,
            ChatMemberStatus::Left => MemberRole::Left,
            ChatMemberStatus::Banned => MemberRole::Banned,
        };
        Ok(role)
    }
}
