// src/task/lock.rs

use tokio::sync::Notify;

/// Shared wakeup handle for task state changes.
///
/// Each task starts with a private `StateLock`; before execution a scheduler
/// swaps in a single shared one so that a state change in *any* task wakes
/// it. Waiters never trust a wakeup: [`StateLock::wait_until`] re-checks its
/// condition on every wake, so spurious or unrelated notifications are
/// harmless.
#[derive(Debug, Default)]
pub struct StateLock {
    notify: Notify,
}

impl StateLock {
    pub fn new() -> Self {
        Self {
            notify: Notify::new(),
        }
    }

    /// Wake every current waiter. Called after each successful state
    /// transition.
    pub fn notify_all(&self) {
        self.notify.notify_waiters();
    }

    /// Block until `cond` returns true.
    ///
    /// The waiter is registered *before* the condition is checked, so a
    /// notification that races with the check is never lost.
    pub async fn wait_until<F>(&self, mut cond: F)
    where
        F: FnMut() -> bool,
    {
        let mut notified = std::pin::pin!(self.notify.notified());
        loop {
            notified.as_mut().enable();
            if cond() {
                return;
            }
            notified.as_mut().await;
            notified.set(self.notify.notified());
        }
    }
}
