//! Byte-level upload progress.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Receives `(bytes_sent, bytes_total)` as binary parts are handed to the transport.
///
/// Called from whichever worker polls the request body.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, bytes_sent: u64, bytes_total: u64);
}

impl<F> ProgressSink for F
where
    F: Fn(u64, u64) + Send + Sync,
{
    fn on_progress(&self, bytes_sent: u64, bytes_total: u64) {
        self(bytes_sent, bytes_total)
    }
}

/// Discards progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&self, _bytes_sent: u64, _bytes_total: u64) {}
}

/// Shared byte counter for one request body.
#[derive(Clone)]
pub struct ProgressCounter {
    sent: Arc<AtomicU64>,
    total: u64,
    sink: Arc<dyn ProgressSink>,
}

impl ProgressCounter {
    pub fn new(total: u64, sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            sent: Arc::new(AtomicU64::new(0)),
            total,
            sink,
        }
    }

    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Acquire)
    }

    /// Record `n` more bytes and notify the sink. Never reports past `total`.
    pub fn advance(&self, n: u64) {
        let now = self.sent.fetch_add(n, Ordering::AcqRel).saturating_add(n);
        self.sink.on_progress(now.min(self.total), self.total);
    }
}
