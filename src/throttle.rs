//! Process-wide token-operation throttle.
//!
//! A single [`TokenOperationObserver`] instance is shared (by explicit
//! injection, never a global) across every form in the process. It is an
//! advisory signal: UI consumers read it to gate the submit button, but a
//! direct token request is never blocked by it.
//!
//! The state machine:
//!
//! ```text
//! Acceptable --start_request--> Running --complete_request--> Throttled
//!      ^                                                          |
//!      +---------------- cooldown elapses -----------------------+
//! ```
//!
//! `start_request` while `Throttled` cancels the pending cooldown reset and
//! re-enters `Running`; `complete_request` always schedules exactly one
//! reset. Only the flow's request-started/request-completed hooks mutate the
//! state; everyone else reads.

use crate::observable::{ObservableValue, Subscription};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Whether the UI should currently offer a new token-creation submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenOperationStatus {
    /// No recent request; submitting is fine.
    Acceptable,
    /// A request is in flight.
    Running,
    /// A request just finished; cooling down.
    Throttled,
}

/// Shared throttle state with cooldown-based auto-reset.
pub struct TokenOperationObserver {
    status: ObservableValue<TokenOperationStatus>,
    cooldown: Duration,
    reset_task: Mutex<Option<JoinHandle<()>>>,
}

impl TokenOperationObserver {
    /// Default cooldown between a completed request and `Acceptable`.
    pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(5);

    /// Creates an observer with the default cooldown.
    pub fn new() -> Arc<Self> {
        Self::with_cooldown(Self::DEFAULT_COOLDOWN)
    }

    /// Creates an observer with a custom cooldown.
    pub fn with_cooldown(cooldown: Duration) -> Arc<Self> {
        Arc::new(Self {
            status: ObservableValue::new(TokenOperationStatus::Acceptable),
            cooldown,
            reset_task: Mutex::new(None),
        })
    }

    /// The current status.
    pub fn status(&self) -> TokenOperationStatus {
        self.status.get()
    }

    /// Registers a status listener; fires on every real transition.
    pub fn subscribe(
        &self,
        observer: impl Fn(&TokenOperationStatus) + Send + 'static,
    ) -> Subscription {
        self.status.subscribe(observer)
    }

    /// Marks a token request dispatched.
    ///
    /// Cancels any pending cooldown reset, so a request arriving while
    /// `Throttled` re-enters `Running` instead of being reset from under
    /// itself.
    pub fn start_request(self: &Arc<Self>) {
        self.abort_pending_reset();
        debug!(status = "running", "token operation started");
        self.status.set(TokenOperationStatus::Running);
    }

    /// Marks the in-flight token request finished (success or failure).
    ///
    /// Enters `Throttled` and schedules exactly one reset back to
    /// `Acceptable` after the cooldown.
    pub fn complete_request(self: &Arc<Self>) {
        self.abort_pending_reset();
        debug!(status = "throttled", "token operation completed");
        self.status.set(TokenOperationStatus::Throttled);

        let observer = Arc::downgrade(self);
        let cooldown = self.cooldown;
        let task = tokio::spawn(async move {
            tokio::time::sleep(cooldown).await;
            if let Some(observer) = observer.upgrade() {
                debug!(status = "acceptable", "token operation cooldown elapsed");
                observer.status.set(TokenOperationStatus::Acceptable);
            }
        });
        *self
            .reset_task
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(task);
    }

    fn abort_pending_reset(&self) {
        if let Some(task) = self
            .reset_task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            task.abort();
        }
    }
}

impl Drop for TokenOperationObserver {
    fn drop(&mut self) {
        if let Some(task) = self
            .reset_task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            task.abort();
        }
    }
}
