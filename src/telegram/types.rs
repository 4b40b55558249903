use std::sync::Arc;

use chrono_tz::Tz;
use teloxide::{
    prelude::*,
    types::{ChatId, Message, UserId},
    utils::command::BotCommands,
};

use crate::{
    config::AppConfig,
    tasks::{DeletionScheduler, MediaPolicyService, StickyScheduler},
    transport::Transport,
};

pub type BotResult<T> = Result<T, teloxide::RequestError>;

pub struct AppState {
    pub config: Arc<AppConfig>,
    pub transport: Arc<dyn Transport>,
    pub sticky: Arc<StickyScheduler>,
    pub media: Arc<MediaPolicyService>,
    pub deletions: Arc<DeletionScheduler>,
}

impl AppState {
    pub fn timezone(&self) -> Tz {
        self.config.timezone.parse().unwrap_or(chrono_tz::UTC)
    }
}

#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "snake_case", description = "Available commands:")]
pub enum StickyCommand {
    #[command(description = "show this help")]
    Help,
    #[command(description = "keep a message at the bottom: /sticky <text>, or reply to a message")]
    Sticky(String),
    #[command(description = "remove the sticky message")]
    Unsticky,
    #[command(description = "keep the sticky active for N minutes from now")]
    SetTime(String),
    #[command(description = "delete media N minutes after it is posted")]
    ClearMedia(String),
    #[command(description = "stop deleting media")]
    AllowMedia,
    #[command(description = "show the current sticky")]
    StickyStatus,
    #[command(description = "show this chat's id")]
    Chatid,
}

/// Creators and administrators, plus admins posting anonymously as the chat.
pub async fn is_chat_admin(transport: &dyn Transport, msg: &Message) -> bool {
    let sender_chat = msg.sender_chat.as_ref().map(|chat| chat.id);
    let user_id = msg.from.as_ref().map(|user| user.id);
    is_admin_sender(transport, msg.chat.id, user_id, sender_chat).await
}

pub async fn is_admin_sender(
    transport: &dyn Transport,
    chat_id: ChatId,
    user_id: Option<UserId>,
    sender_chat: Option<ChatId>,
) -> bool {
    if sender_chat == Some(chat_id) {
        return true;
    }
    let Some(user_id) = user_id else {
        return false;
    };
    match transport.member_role(chat_id, user_id).await {
        Ok(role) => role.is_admin(),
        Err(err) => {
            tracing::warn!(
                target: "telegram",
                error = %err,
                chat_id = chat_id.0,
                user_id = user_id.0,
                "role lookup failed"
            );
            false
        }
    }
}
