//! Cooperative cancellation for in-flight requests.
//!
//! The invariant the rest of the crate builds on: once a token is canceled,
//! no completion path that checks it will deliver a result. Cancellation is
//! idempotent and observable from any clone.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// A shareable cancellation flag.
///
/// Clones observe the same state; canceling any clone cancels them all.
#[derive(Clone, Default)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    canceled: AtomicBool,
    notify: Notify,
}

impl CancellationToken {
    /// A fresh, un-canceled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the token canceled and wakes every waiter. Idempotent.
    pub fn cancel(&self) {
        self.inner.canceled.store(true, Ordering::Release);
        self.inner.notify.notify_waiters();
    }

    /// True once [`CancellationToken::cancel`] has been called.
    pub fn is_canceled(&self) -> bool {
        self.inner.canceled.load(Ordering::Acquire)
    }

    /// Resolves when the token is canceled; immediately if it already was.
    pub async fn canceled(&self) {
        // Register as a waiter before the flag check so a cancel between the
        // check and the await cannot be missed
        let mut notified = std::pin::pin!(self.inner.notify.notified());
        notified.as_mut().enable();
        if self.is_canceled() {
            return;
        }
        notified.await;
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("canceled", &self.is_canceled())
            .finish()
    }
}
