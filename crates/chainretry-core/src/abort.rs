//! Abort signal for in-progress retry loops.
//!
//! A caller hands an `AbortToken` to the executor; any clone can trigger it
//! (e.g. a Ctrl-C handler or a request deadline). The executor checks the
//! token before each invocation and races it against every backoff delay.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct AbortState {
    triggered: AtomicBool,
    notify: Notify,
}

/// Cloneable abort flag that can also be awaited.
#[derive(Debug, Clone, Default)]
pub struct AbortToken {
    state: Arc<AbortState>,
}

impl AbortToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request abort. Idempotent; wakes every task waiting in `triggered()`.
    pub fn trigger(&self) {
        self.state.triggered.store(true, Ordering::SeqCst);
        self.state.notify.notify_waiters();
    }

    pub fn is_triggered(&self) -> bool {
        self.state.triggered.load(Ordering::SeqCst)
    }

    /// Resolves once `trigger()` has been called.
    pub async fn triggered(&self) {
        loop {
            // Register before checking the flag so a trigger between the
            // check and the await is not lost.
            let notified = self.state.notify.notified();
            if self.is_triggered() {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn new_token_is_not_triggered() {
        let token = AbortToken::new();
        assert!(!token.is_triggered());
        token.trigger();
        assert!(token.is_triggered());
        token.trigger();
        assert!(token.is_triggered());
    }

    #[test]
    fn clones_share_state() {
        let token = AbortToken::new();
        let clone = token.clone();
        clone.trigger();
        assert!(token.is_triggered());
    }

    #[tokio::test]
    async fn triggered_returns_immediately_when_already_set() {
        let token = AbortToken::new();
        token.trigger();
        tokio::time::timeout(Duration::from_millis(100), token.triggered())
            .await
            .expect("already triggered");
    }

    #[tokio::test]
    async fn triggered_wakes_waiting_task() {
        let token = AbortToken::new();
        let waiter = {
            let token = token.clone();
            tokio::spawn(async move { token.triggered().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        token.trigger();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake")
            .unwrap();
    }
}
