// src/engine/abort.rs

use std::pin::pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// Cancellation handle shared by every job launched in one "generation".
///
/// The orchestrator cancels the current token on abort and replaces it with
/// a fresh one, so jobs started afterwards are unaffected.
#[derive(Debug, Clone, Default)]
pub struct AbortToken {
    inner: Arc<AbortInner>,
}

#[derive(Debug, Default)]
struct AbortInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl AbortToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once `cancel` has been called on this token or any clone.
    pub async fn cancelled(&self) {
        loop {
            let mut notified = pin!(self.inner.notify.notified());
            // Register before checking the flag so a concurrent `cancel`
            // cannot slip between the check and the await.
            notified.as_mut().enable();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}
