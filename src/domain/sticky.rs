use std::time::Duration;

use teloxide::types::{ChatId, MessageId};
use tokio::time::Instant;

/// What gets posted each time the sticky is re-sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StickyContent {
    Text(String),
    /// Duplicate of an existing message, attachments included.
    CopyOf {
        source_chat_id: ChatId,
        source_message_id: MessageId,
    },
}

#[derive(Debug, Clone)]
pub struct StickyEntry {
    pub content: StickyContent,
    /// Instance currently visible in the chat; must be deleted before the
    /// next one is posted or the entry is dropped.
    pub current_message_id: Option<MessageId>,
    pub active_until: Instant,
}

impl StickyEntry {
    pub fn new(content: StickyContent, active_until: Instant) -> Self {
        Self {
            content,
            current_message_id: None,
            active_until,
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now > self.active_until
    }

    pub fn snapshot(&self, now: Instant) -> StickySnapshot {
        StickySnapshot {
            content: self.content.clone(),
            current_message_id: self.current_message_id,
            remaining: self.active_until.saturating_duration_since(now),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StickySnapshot {
    pub content: StickyContent,
    pub current_message_id: Option<MessageId>,
    pub remaining: Duration,
}
