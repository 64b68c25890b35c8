//! Batch success accounting

use super::{PostProcessContext, PostProcessStep};
use crate::error::Result;
use crate::types::BatchResult;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Counters shared by every item procedure of one batch
#[derive(Debug, Default)]
pub struct BatchCounters {
    completed: AtomicUsize,
    had_errors: AtomicBool,
}

impl BatchCounters {
    /// Count one fully post-processed primary transfer
    pub fn record_completion(&self) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }

    /// Flag that an item-level failure occurred
    pub fn record_error(&self) {
        self.had_errors.store(true, Ordering::SeqCst);
    }

    /// Current totals
    pub fn snapshot(&self) -> BatchResult {
        BatchResult {
            completed_count: self.completed.load(Ordering::SeqCst),
            had_errors: self.had_errors.load(Ordering::SeqCst),
        }
    }
}

/// Final step: counts the episode as completed
///
/// Always applies. Placed last so the counter only moves once every earlier
/// step succeeded.
pub struct CompletionStep {
    counters: Arc<BatchCounters>,
}

impl CompletionStep {
    /// Create a completion step feeding `counters`
    pub fn new(counters: Arc<BatchCounters>) -> Self {
        Self { counters }
    }
}

#[async_trait]
impl PostProcessStep for CompletionStep {
    fn name(&self) -> &'static str {
        "completion"
    }

    fn applies(&self, _ctx: &PostProcessContext<'_>) -> bool {
        true
    }

    async fn run(&self, _ctx: &PostProcessContext<'_>) -> Result<()> {
        self.counters.record_completion();
        Ok(())
    }
}
