use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::Mutex;
use teloxide::types::{ChatId, MessageId, UserId};

use super::{Transport, TransportError, TransportResult};
use crate::domain::MemberRole;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Send(ChatId, String, MessageId),
    Copy(ChatId, ChatId, MessageId, MessageId),
    Delete(ChatId, MessageId),
}

/// Records every call and hands out increasing message ids starting at 100.
#[derive(Default)]
pub struct FakeTransport {
    next_id: Mutex<i32>,
    calls: Mutex<Vec<Call>>,
    fail_posts: Mutex<bool>,
    fail_deletes: Mutex<bool>,
    rejected_text: Mutex<Option<String>>,
    gone: Mutex<HashSet<(ChatId, MessageId)>>,
    roles: Mutex<HashMap<(ChatId, UserId), MemberRole>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self {
            next_id: Mutex::new(100),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn sends(&self) -> Vec<MessageId> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Send(_, _, id) | Call::Copy(_, _, _, id) => Some(id),
                Call::Delete(..) => None,
            })
            .collect()
    }

    pub fn deletes(&self) -> Vec<(ChatId, MessageId)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Delete(chat, id) => Some((chat, id)),
                _ => None,
            })
            .collect()
    }

    pub fn set_fail_posts(&self, fail: bool) {
        *self.fail_posts.lock() = fail;
    }

    pub fn set_fail_deletes(&self, fail: bool) {
        *self.fail_deletes.lock() = fail;
    }

    /// Rejects text sends containing `fragment`; other sends go through.
    pub fn reject_texts_containing(&self, fragment: &str) {
        *self.rejected_text.lock() = Some(fragment.to_string());
    }

    pub fn mark_gone(&self, chat_id: ChatId, message_id: MessageId) {
        self.gone.lock().insert((chat_id, message_id));
    }

    pub fn set_role(&self, chat_id: ChatId, user_id: UserId, role: MemberRole) {
        self.roles.lock().insert((chat_id, user_id), role);
    }

    fn alloc(&self) -> MessageId {
        let mut next = self.next_id.lock();
        let id = *next;
        *next += 1;
        MessageId(id)
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> TransportResult<MessageId> {
        if *self.fail_posts.lock() {
            return Err(TransportError::Rejected("send disabled".into()));
        }
        if let Some(fragment) = self.rejected_text.lock().as_deref() {
            if text.contains(fragment) {
                return Err(TransportError::Rejected("send refused".into()));
            }
        }
        let id = self.alloc();
        self.calls
            .lock()
            .push(Call::Send(chat_id, text.to_string(), id));
        Ok(id)
    }

    async fn copy_message(
        &self,
        chat_id: ChatId,
        source_chat_id: ChatId,
        source_message_id: MessageId,
    ) -> TransportResult<MessageId> {
        if *self.fail_posts.lock() {
            return Err(TransportError::Rejected("copy disabled".into()));
        }
        let id = self.alloc();
        self.calls
            .lock()
            .push(Call::Copy(chat_id, source_chat_id, source_message_id, id));
        Ok(id)
    }

    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> TransportResult<()> {
        self.calls.lock().push(Call::Delete(chat_id, message_id));
        if self.gone.lock().contains(&(chat_id, message_id)) {
            return Err(TransportError::NotFound);
        }
        if *self.fail_deletes.lock() {
            return Err(TransportError::Rejected("delete disabled".into()));
        }
        Ok(())
    }

    async fn member_role(&self, chat_id: ChatId, user_id: UserId) -> TransportResult<MemberRole> {
        self.roles
            .lock()
            .get(&(chat_id, user_id))
            .copied()
            .ok_or_else(|| TransportError::Rejected("user not found".into()))
    }
}
