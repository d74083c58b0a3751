//! Cooperative interruption of blocking waits
//!
//! Rust threads cannot be interrupted from outside, so every blocking wait in
//! this crate polls an [`InterruptFlag`]. Raising the flag makes the wait fail
//! with [`ProcessError::Interrupted`](crate::ProcessError::Interrupted). The
//! flag is never consumed by a wait: it stays raised until [`InterruptFlag::clear`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag interrupting the waits of a [`ProcessHandle`](crate::ProcessHandle)
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag {
    raised: Arc<AtomicBool>,
}

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag; waits observe it within one poll slice
    pub fn interrupt(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    pub fn is_interrupted(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }

    /// Lower the flag so later waits block again
    pub fn clear(&self) {
        self.raised.store(false, Ordering::SeqCst);
    }
}
