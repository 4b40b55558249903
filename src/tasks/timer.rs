use std::{future::Future, time::Duration};

use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;

/// One-shot delayed callbacks on the tokio runtime.
///
/// Every timer hangs off a root token so `shutdown` drops whatever has not
/// fired yet.
#[derive(Clone, Default)]
pub struct TimerService {
    root: CancellationToken,
}

/// Cancelling is advisory: a callback already past its wait keeps running.
#[derive(Debug, Clone)]
pub struct TimerHandle {
    cancel: CancellationToken,
}

impl TimerService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Instant {
        Instant::now()
    }

    pub fn schedule<F>(&self, delay: Duration, task: F) -> TimerHandle
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let cancel = self.root.child_token();
        let token = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {}
                _ = sleep(delay) => task.await,
            }
        });
        TimerHandle { cancel }
    }

    pub fn shutdown(&self) {
        self.root.cancel();
    }
}

impl TimerHandle {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
