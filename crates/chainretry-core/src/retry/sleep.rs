//! Pluggable backoff delay.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Source of the inter-attempt delay. The executor races it against the
/// abort token, so implementations must yield rather than block the thread.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, delay: Duration);
}

/// Real timer backed by `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

/// Returns immediately and remembers every requested delay.
/// Clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    calls: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays requested so far, in order.
    pub fn calls(&self) -> Vec<Duration> {
        match self.calls.lock() {
            Ok(calls) => calls.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn record(&self, delay: Duration) {
        match self.calls.lock() {
            Ok(mut calls) => calls.push(delay),
            Err(poisoned) => poisoned.into_inner().push(delay),
        }
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, delay: Duration) {
        self.record(delay);
        tokio::task::yield_now().await;
    }
}
