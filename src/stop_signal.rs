//! One-shot shutdown flag observed by every producer and consumer.

use std::sync::atomic::{AtomicBool, Ordering};

/// Shared stop flag. Transitions false -> true at most once and never back.
#[derive(Debug, Default)]
pub struct StopSignal {
    stopped: AtomicBool,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag. Returns `true` only for the call that performed the transition.
    pub fn set(&self) -> bool {
        !self.stopped.swap(true, Ordering::SeqCst)
    }

    /// Non-blocking read, safe from any thread.
    pub fn is_set(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}
