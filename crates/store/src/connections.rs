//! Live-connection accounting for the database sinks.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone, Default)]
pub(crate) struct ConnectionCounter(Arc<AtomicUsize>);

impl ConnectionCounter {
    pub(crate) fn track(&self) -> LiveConnection {
        self.0.fetch_add(1, Ordering::SeqCst);
        LiveConnection(self.0.clone())
    }

    pub(crate) fn live(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Held next to an open connection; released when dropped.
pub(crate) struct LiveConnection(Arc<AtomicUsize>);

impl Drop for LiveConnection {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
