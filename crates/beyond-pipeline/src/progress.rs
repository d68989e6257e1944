//! Byte counts to a monotonic percentage.

use std::sync::atomic::{AtomicU8, Ordering};

use beyond_api_client::ProgressSink;

/// Linear mapping of `sent / total` to 0–100. An empty body counts as complete.
pub fn percent_of(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let pct = (sent.min(total) as u128 * 100) / total as u128;
    pct as u8
}

/// Forwards a percentage only when it increases, so a resent body never moves
/// progress backwards.
pub struct PercentTracker<F> {
    last: AtomicU8,
    on_percent: F,
}

impl<F> PercentTracker<F>
where
    F: Fn(u8) + Send + Sync,
{
    pub fn new(on_percent: F) -> Self {
        Self {
            last: AtomicU8::new(0),
            on_percent,
        }
    }

    pub fn last(&self) -> u8 {
        self.last.load(Ordering::Acquire)
    }
}

impl<F> ProgressSink for PercentTracker<F>
where
    F: Fn(u8) + Send + Sync,
{
    fn on_progress(&self, bytes_sent: u64, bytes_total: u64) {
        let pct = percent_of(bytes_sent, bytes_total);
        let prev = self.last.fetch_max(pct, Ordering::AcqRel);
        if pct > prev {
            (self.on_percent)(pct);
        }
    }
}
