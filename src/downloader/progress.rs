//! Rate-gated progress notifications for one in-flight transfer

use std::time::{Duration, Instant};

/// Decides which progress updates are forwarded
///
/// Every chunk is offered; an update passes only when at least one byte has
/// been transferred, the transfer is not yet complete, and `interval` has
/// elapsed since the last forwarded update. The first qualifying update
/// always passes. Each transfer owns its throttle, so there is no
/// cross-task state.
#[derive(Debug, Clone)]
pub struct ProgressThrottle {
    interval: Duration,
    last_emit: Option<Instant>,
}

impl ProgressThrottle {
    /// Create a throttle forwarding at most one update per `interval`
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_emit: None,
        }
    }

    /// Offer an update observed now
    pub fn should_emit(&mut self, transferred: u64, total: Option<u64>) -> bool {
        self.should_emit_at(Instant::now(), transferred, total)
    }

    /// Offer an update observed at `now`
    pub fn should_emit_at(&mut self, now: Instant, transferred: u64, total: Option<u64>) -> bool {
        if transferred == 0 {
            return false;
        }
        if total.is_some_and(|total| transferred >= total) {
            return false;
        }

        match self.last_emit {
            Some(last) if now.saturating_duration_since(last) < self.interval => false,
            _ => {
                self.last_emit = Some(now);
                true
            }
        }
    }
}

/// Bytes to megabytes (decimal), for log lines
pub(crate) fn as_mb(bytes: u64) -> f64 {
    bytes as f64 / 1_000_000.0
}
