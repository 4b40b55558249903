use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;
use teloxide::types::ChatId;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::{domain::StickyEntry, tasks::timer::TimerHandle};

/// The debounce timer currently armed for a chat.
#[derive(Debug)]
pub struct PendingRepost {
    generation: u64,
    handle: TimerHandle,
}

/// Everything the scheduler tracks for one chat. Only reachable through
/// `StickyRegistry::lock`, which serialises access per chat.
#[derive(Debug, Default)]
pub struct ChatSlot {
    pub entry: Option<StickyEntry>,
    pending: Option<PendingRepost>,
    generation: u64,
}

impl ChatSlot {
    /// Reserves the token for the next debounce timer.
    pub fn next_generation(&mut self) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.generation
    }

    /// Replaces (and cancels) any pending repost.
    pub fn arm(&mut self, generation: u64, handle: TimerHandle) {
        self.cancel_pending();
        self.pending = Some(PendingRepost { generation, handle });
    }

    pub fn cancel_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.handle.cancel();
        }
    }

    /// Clears the pending repost if `generation` still owns it. A `false`
    /// means the caller lost a race with a newer trigger or a teardown.
    pub fn claim(&mut self, generation: u64) -> bool {
        match &self.pending {
            Some(pending)
                if pending.generation == generation && !pending.handle.is_cancelled() =>
            {
                self.pending = None;
                true
            }
            _ => false,
        }
    }
}

#[derive(Default)]
pub struct StickyRegistry {
    slots: Mutex<HashMap<ChatId, Arc<AsyncMutex<ChatSlot>>>>,
}

impl StickyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exclusive access to one chat's slot, created on first use. Other
    /// chats are not blocked while the guard is held.
    pub async fn lock(&self, chat_id: ChatId) -> OwnedMutexGuard<ChatSlot> {
        let slot = {
            let mut slots = self.slots.lock();
            slots.entry(chat_id).or_default().clone()
        };
        slot.lock_owned().await
    }

    /// Like `lock`, but never creates a slot for a chat that has none.
    pub async fn lock_existing(&self, chat_id: ChatId) -> Option<OwnedMutexGuard<ChatSlot>> {
        let slot = self.slots.lock().get(&chat_id).cloned()?;
        Some(slot.lock_owned().await)
    }

    pub fn chat_ids(&self) -> Vec<ChatId> {
        self.slots.lock().keys().copied().collect()
    }
}
