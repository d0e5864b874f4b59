//! Cooperative cancellation between the two halves of a mapping.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A one-way cancellation flag.
///
/// Clones share the same flag. Raising it never interrupts I/O already in
/// flight; the observing side checks it before starting the next blocking
/// step and returns `Error::Cancelled` once it is set.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}
