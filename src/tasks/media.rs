use std::sync::Arc;

use teloxide::types::{ChatId, MessageId};

use super::deletion::{DeletionScheduler, PendingDeletion};
use crate::state::MediaPolicyRegistry;

/// Dispatches media messages to the deletion scheduler according to the
/// chat's policy.
pub struct MediaPolicyService {
    registry: MediaPolicyRegistry,
    deletions: Arc<DeletionScheduler>,
}

impl MediaPolicyService {
    pub fn new(registry: MediaPolicyRegistry, deletions: Arc<DeletionScheduler>) -> Self {
        Self {
            registry,
            deletions,
        }
    }

    pub fn registry(&self) -> &MediaPolicyRegistry {
        &self.registry
    }

    pub fn on_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        has_media: bool,
    ) -> Option<PendingDeletion> {
        if !has_media {
            return None;
        }
        let policy = self.registry.get(chat_id).filter(|p| p.enabled)?;
        tracing::debug!(
            target: "media",
            chat_id = chat_id.0,
            message_id = message_id.0,
            delay_minutes = policy.delay_minutes,
            "media message queued for deletion"
        );
        Some(
            self.deletions
                .schedule_deletion(chat_id, message_id, policy.delay()),
        )
    }
}
