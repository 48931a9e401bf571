//! Scheduler statistics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Point-in-time view of a scheduler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    /// Scheduler name.
    pub name: String,
    /// Configured concurrency ceiling.
    pub concurrency_limit: usize,
    /// Tasks executing right now.
    pub active: usize,
    /// Tasks waiting in the queue.
    pub queued: usize,
    /// Whether admission is paused.
    pub paused: bool,
    /// Highest number of simultaneously active tasks observed.
    pub peak_active: usize,
    /// Total tasks submitted.
    pub submitted: u64,
    /// Total tasks admitted.
    pub started: u64,
    /// Total tasks that finished successfully.
    pub completed: u64,
    /// Total tasks that failed, panicked or timed out.
    pub failed: u64,
    /// Total tasks cancelled before starting.
    pub cancelled: u64,
}

/// Internal counters for scheduler statistics (thread-safe).
#[derive(Debug, Default)]
pub(crate) struct SchedulerCounters {
    pub submitted: AtomicU64,
    pub started: AtomicU64,
    pub completed: AtomicU64,
    pub failed: AtomicU64,
    pub cancelled: AtomicU64,
}

impl SchedulerCounters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(counter: &AtomicU64, n: usize) {
        counter.fetch_add(n as u64, Ordering::Relaxed);
    }

    /// Copy the monotonic counters into a stats snapshot.
    pub fn fill(&self, stats: &mut SchedulerStats) {
        stats.submitted = self.submitted.load(Ordering::Relaxed);
        stats.started = self.started.load(Ordering::Relaxed);
        stats.completed = self.completed.load(Ordering::Relaxed);
        stats.failed = self.failed.load(Ordering::Relaxed);
        stats.cancelled = self.cancelled.load(Ordering::Relaxed);
    }
}
