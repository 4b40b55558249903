use std::{sync::Arc, time::Duration};

use teloxide::types::{ChatId, MessageId};
use tokio::time::Instant;

use super::timer::{TimerHandle, TimerService};
use crate::transport::{Transport, TransportError};

/// A scheduled `(chat, message)` deletion. Dropping it does not cancel it.
#[derive(Debug, Clone)]
pub struct PendingDeletion {
    pub chat_id: ChatId,
    pub message_id: MessageId,
    pub fire_at: Instant,
    handle: TimerHandle,
}

impl PendingDeletion {
    pub fn cancel(&self) {
        self.handle.cancel();
    }
}

/// "Delete this message in N seconds". Each call arms its own timer; several
/// deletions for the same chat or message run side by side.
pub struct DeletionScheduler {
    transport: Arc<dyn Transport>,
    timers: TimerService,
}

impl DeletionScheduler {
    pub fn new(transport: Arc<dyn Transport>, timers: TimerService) -> Self {
        Self { transport, timers }
    }

    pub fn schedule_deletion(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        delay: Duration,
    ) -> PendingDeletion {
        let transport = self.transport.clone();
        let fire_at = self.timers.now() + delay;
        let handle = self.timers.schedule(delay, async move {
            match transport.delete_message(chat_id, message_id).await {
                Ok(()) => tracing::debug!(
                    target: "deletion",
                    chat_id = chat_id.0,
                    message_id = message_id.0,
                    "scheduled deletion done"
                ),
                Err(TransportError::NotFound) => tracing::debug!(
                    target: "deletion",
                    chat_id = chat_id.0,
                    message_id = message_id.0,
                    "message already gone"
                ),
                Err(err) => tracing::warn!(
                    target: "deletion",
                    error = %err,
                    chat_id = chat_id.0,
                    message_id = message_id.0,
                    "scheduled deletion failed"
                ),
            }
        });
        let pending = PendingDeletion {
            chat_id,
            message_id,
            fire_at,
            handle,
        };
        tracing::debug!(
            target: "deletion",
            chat_id = pending.chat_id.0,
            message_id = pending.message_id.0,
            delay_secs = pending.fire_at.saturating_duration_since(self.timers.now()).as_secs(),
            "deletion scheduled"
        );
        pending
    }
}

#[cfg(test)]
mod tests {
    use tokio::time::sleep;

    use super::*;
    use crate::transport::fake::FakeTransport;

    fn scheduler() -> (Arc<FakeTransport>, DeletionScheduler) {
        let transport = Arc::new(FakeTransport::new());
        let scheduler = DeletionScheduler::new(transport.clone(), TimerService::new());
        (transport, scheduler)
    }

    #[tokio::test(start_paused = true)]
    async fn deletes_after_delay() {
        let (transport, scheduler) = scheduler();
        let pending =
            scheduler.schedule_deletion(ChatId(-5), MessageId(9), Duration::from_secs(30));
        assert_eq!(pending.fire_at - Instant::now(), Duration::from_secs(30));

        sleep(Duration::from_secs(29)).await;
        assert!(transport.deletes().is_empty());

        sleep(Duration::from_secs(2)).await;
        assert_eq!(transport.deletes(), vec![(ChatId(-5), MessageId(9))]);
    }

    #[tokio::test(start_paused = true)]
    async fn deletions_do_not_supersede_each_other() {
        let (transport, scheduler) = scheduler();
        scheduler.schedule_deletion(ChatId(-5), MessageId(1), Duration::from_secs(10));
        scheduler.schedule_deletion(ChatId(-5), MessageId(2), Duration::from_secs(5));
        scheduler.schedule_deletion(ChatId(-5), MessageId(1), Duration::from_secs(20));

        sleep(Duration::from_secs(30)).await;
        assert_eq!(
            transport.deletes(),
            vec![
                (ChatId(-5), MessageId(2)),
                (ChatId(-5), MessageId(1)),
                (ChatId(-5), MessageId(1)),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_deletion_is_skipped() {
        let (transport, scheduler) = scheduler();
        let pending =
            scheduler.schedule_deletion(ChatId(-5), MessageId(3), Duration::from_secs(10));
        pending.cancel();

        sleep(Duration::from_secs(15)).await;
        assert!(transport.deletes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failures_are_absorbed() {
        let (transport, scheduler) = scheduler();
        transport.mark_gone(ChatId(-5), MessageId(4));
        transport.set_fail_deletes(true);
        scheduler.schedule_deletion(ChatId(-5), MessageId(4), Duration::from_secs(1));
        scheduler.schedule_deletion(ChatId(-5), MessageId(5), Duration::from_secs(1));

        sleep(Duration::from_secs(2)).await;
        assert_eq!(transport.deletes().len(), 2);
    }
}
