//! Cooperative cancellation flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A shared boolean the running insert loop reads between rows.
///
/// Setting it never interrupts a row already in flight; the loop stops at
/// the next boundary. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    inner: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.inner.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.load(Ordering::SeqCst)
    }

    /// Clear a previous request before starting another run.
    pub fn reset(&self) {
        self.inner.store(false, Ordering::SeqCst);
    }
}
