//! Job progress tracking
//!
//! One tracker per job, written only from the orchestrator's single
//! execution loop. Reads are lock-free atomic snapshots, safe from any
//! observer task. Cancellation is a cooperative flag on a
//! [`CancellationToken`]; it never interrupts in-flight work, the
//! orchestrator observes it at the next batch boundary.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;

use crate::types::ProgressSnapshot;

/// Tracks attempted batches and cancellation intent for one job
#[derive(Clone, Debug)]
pub struct ProgressTracker {
    current: Arc<AtomicUsize>,
    total: Arc<AtomicUsize>,
    cancel: CancellationToken,
}

impl ProgressTracker {
    /// Create a tracker for a job with `total` planned batches
    ///
    /// A job whose plan is not yet known starts at zero; the orchestrator
    /// sets the total once planning succeeds.
    pub fn new(total: usize) -> Self {
        Self {
            current: Arc::new(AtomicUsize::new(0)),
            total: Arc::new(AtomicUsize::new(total)),
            cancel: CancellationToken::new(),
        }
    }

    /// Set the planned batch count, once, when the plan is obtained
    pub(crate) fn set_total(&self, total: usize) {
        self.total.store(total, Ordering::SeqCst);
    }

    /// Record one attempted batch
    ///
    /// Called exactly once per batch by the execution loop. Advancing past
    /// the planned batch count is a programmer error in the single-writer
    /// loop and fatal.
    pub fn advance(&self) {
        let previous = self.current.fetch_add(1, Ordering::SeqCst);
        assert!(
            previous < self.total.load(Ordering::SeqCst),
            "progress advanced past {} planned batches",
            self.total.load(Ordering::SeqCst)
        );
    }

    /// Request cooperative cancellation
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Current read-only view of the job's progress
    pub fn snapshot(&self) -> ProgressSnapshot {
        let current = self.current.load(Ordering::SeqCst);
        let total = self.total.load(Ordering::SeqCst);
        let percent = if total == 0 {
            0.0
        } else {
            (current as f32 / total as f32 * 100.0).clamp(0.0, 100.0)
        };
        ProgressSnapshot {
            current_batch: current,
            total_batches: total,
            percent,
            cancelled: self.is_cancelled(),
        }
    }
}
