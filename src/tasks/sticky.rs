use std::{sync::Arc, time::Duration};

use teloxide::types::{ChatId, MessageId};
use tokio::time::Instant;

use super::timer::TimerService;
use crate::{
    domain::{types::minutes, MinutesRange, StickyContent, StickyEntry, StickySnapshot},
    state::{ChatSlot, StickyRegistry},
    transport::{Transport, TransportError},
};

/// Keeps each chat's sticky message at the bottom of the conversation.
///
/// Activity is debounced: a burst of messages yields a single repost,
/// `debounce` after the last one. Entries expire at `active_until`; expiry is
/// checked both when activity arrives and when a debounce timer fires.
/// Transport failures are logged and never returned to callers.
pub struct StickyScheduler {
    registry: StickyRegistry,
    transport: Arc<dyn Transport>,
    timers: TimerService,
    debounce: Duration,
    limits: MinutesRange,
}

impl StickyScheduler {
    pub fn new(
        transport: Arc<dyn Transport>,
        timers: TimerService,
        debounce: Duration,
        limits: MinutesRange,
    ) -> Arc<Self> {
        Arc::new(Self {
            registry: StickyRegistry::new(),
            transport,
            timers,
            debounce,
            limits,
        })
    }

    pub fn limits(&self) -> MinutesRange {
        self.limits
    }

    /// Installs (or replaces) the sticky for `chat_id` and posts it right away.
    pub async fn activate(
        &self,
        chat_id: ChatId,
        content: StickyContent,
        active_minutes: Option<i64>,
    ) -> Instant {
        let minutes_active = self.limits.clamp_or_default(active_minutes);
        let mut slot = self.registry.lock(chat_id).await;
        slot.cancel_pending();

        if let Some(previous) = slot.entry.take() {
            if let Some(message_id) = previous.current_message_id {
                self.delete_quietly(chat_id, message_id).await;
            }
        }

        let active_until = self.timers.now() + minutes(minutes_active);
        let mut entry = StickyEntry::new(content, active_until);
        self.repost(chat_id, &mut entry).await;
        slot.entry = Some(entry);

        tracing::info!(
            target: "sticky",
            chat_id = chat_id.0,
            minutes = minutes_active,
            "sticky activated"
        );
        active_until
    }

    /// Removes the sticky and its posted instance. Returns whether one existed.
    pub async fn deactivate(&self, chat_id: ChatId) -> bool {
        let Some(mut slot) = self.registry.lock_existing(chat_id).await else {
            return false;
        };
        let existed = slot.entry.is_some();
        self.teardown(chat_id, &mut slot).await;
        if existed {
            tracing::info!(target: "sticky", chat_id = chat_id.0, "sticky deactivated");
        }
        existed
    }

    /// Resets the expiry to `now + minutes`. `None` when the chat has no live
    /// sticky; an expired one is torn down rather than revived.
    pub async fn extend(&self, chat_id: ChatId, active_minutes: Option<i64>) -> Option<Instant> {
        let mut slot = self.registry.lock_existing(chat_id).await?;
        if slot.entry.as_ref()?.is_expired(self.timers.now()) {
            tracing::info!(target: "sticky", chat_id = chat_id.0, "sticky expired before extend");
            self.teardown(chat_id, &mut slot).await;
            return None;
        }
        let entry = slot.entry.as_mut()?;
        let minutes_active = self.limits.clamp_or_default(active_minutes);
        entry.active_until = self.timers.now() + minutes(minutes_active);
        tracing::info!(
            target: "sticky",
            chat_id = chat_id.0,
            minutes = minutes_active,
            "sticky lifetime extended"
        );
        Some(entry.active_until)
    }

    /// Called once per qualifying inbound message in `chat_id`.
    pub async fn on_activity(self: &Arc<Self>, chat_id: ChatId) {
        let Some(mut slot) = self.registry.lock_existing(chat_id).await else {
            return;
        };
        let Some(entry) = slot.entry.as_ref() else {
            return;
        };

        if entry.is_expired(self.timers.now()) {
            tracing::info!(target: "sticky", chat_id = chat_id.0, "sticky expired");
            self.teardown(chat_id, &mut slot).await;
            return;
        }

        let generation = slot.next_generation();
        let scheduler = Arc::clone(self);
        let handle = self.timers.schedule(self.debounce, async move {
            scheduler.fire(chat_id, generation).await;
        });
        slot.arm(generation, handle);
    }

    pub async fn status(&self, chat_id: ChatId) -> Option<StickySnapshot> {
        let slot = self.registry.lock_existing(chat_id).await?;
        let now = self.timers.now();
        slot.entry
            .as_ref()
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.snapshot(now))
    }

    /// Cancels every pending repost. Posted stickies stay where they are.
    pub async fn shutdown(&self) {
        for chat_id in self.registry.chat_ids() {
            if let Some(mut slot) = self.registry.lock_existing(chat_id).await {
                slot.cancel_pending();
            }
        }
    }

    async fn fire(&self, chat_id: ChatId, generation: u64) {
        let Some(mut slot) = self.registry.lock_existing(chat_id).await else {
            return;
        };
        if !slot.claim(generation) {
            tracing::trace!(target: "sticky", chat_id = chat_id.0, "stale repost timer ignored");
            return;
        }
        let now = self.timers.now();
        let expired = match slot.entry.as_ref() {
            Some(entry) => entry.is_expired(now),
            None => return,
        };
        if expired {
            tracing::info!(target: "sticky", chat_id = chat_id.0, "sticky expired while pending");
            self.teardown(chat_id, &mut slot).await;
            return;
        }
        if let Some(entry) = slot.entry.as_mut() {
            self.repost(chat_id, entry).await;
        }
    }

    async fn teardown(&self, chat_id: ChatId, slot: &mut ChatSlot) {
        slot.cancel_pending();
        if let Some(entry) = slot.entry.take() {
            if let Some(message_id) = entry.current_message_id {
                self.delete_quietly(chat_id, message_id).await;
            }
        }
    }

    /// Delete-then-post. `current_message_id` ends up as the new id, or as
    /// whatever is still known to be visible when posting fails.
    async fn repost(&self, chat_id: ChatId, entry: &mut StickyEntry) {
        if let Some(previous) = entry.current_message_id {
            match self.transport.delete_message(chat_id, previous).await {
                Ok(()) | Err(TransportError::NotFound) => entry.current_message_id = None,
                Err(err) => tracing::warn!(
                    target: "sticky",
                    error = %err,
                    chat_id = chat_id.0,
                    message_id = previous.0,
                    "failed to delete previous sticky"
                ),
            }
        }

        let posted = match &entry.content {
            StickyContent::Text(text) => self.transport.send_text(chat_id, text).await,
            StickyContent::CopyOf {
                source_chat_id,
                source_message_id,
            } => {
                self.transport
                    .copy_message(chat_id, *source_chat_id, *source_message_id)
                    .await
            }
        };

        match posted {
            Ok(message_id) => {
                entry.current_message_id = Some(message_id);
                tracing::debug!(
                    target: "sticky",
                    chat_id = chat_id.0,
                    message_id = message_id.0,
                    "sticky reposted"
                );
            }
            Err(err) => tracing::error!(
                target: "sticky",
                error = %err,
                chat_id = chat_id.0,
                "failed to post sticky"
            ),
        }
    }

    async fn delete_quietly(&self, chat_id: ChatId, message_id: MessageId) {
        match self.transport.delete_message(chat_id, message_id).await {
            Ok(()) => {}
            Err(TransportError::NotFound) => tracing::debug!(
                target: "sticky",
                chat_id = chat_id.0,
                message_id = message_id.0,
                "sticky already gone"
            ),
            Err(err) => tracing::warn!(
                target: "sticky",
                error = %err,
                chat_id = chat_id.0,
                message_id = message_id.0,
                "failed to delete sticky"
            ),
        }
    }
}
