//! Scripted ledger call used by the retry scenario tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

/// Returns queued failures in order, then `Ok(value)` forever.
/// With `repeat_last`, the final failure is returned forever instead.
pub struct ScriptedCall<E> {
    failures: Mutex<VecDeque<E>>,
    repeat_last: Option<E>,
    value: u32,
    calls: AtomicU32,
}

impl<E: Clone> ScriptedCall<E> {
    pub fn failing_then(failures: Vec<E>, value: u32) -> Self {
        Self {
            failures: Mutex::new(failures.into()),
            repeat_last: None,
            value,
            calls: AtomicU32::new(0),
        }
    }

    pub fn always(failure: E) -> Self {
        Self {
            failures: Mutex::new(VecDeque::new()),
            repeat_last: Some(failure),
            value: 0,
            calls: AtomicU32::new(0),
        }
    }

    pub async fn call(&self) -> Result<u32, E> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(e) = self.failures.lock().unwrap().pop_front() {
            return Err(e);
        }
        match &self.repeat_last {
            Some(e) => Err(e.clone()),
            None => Ok(self.value),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}
