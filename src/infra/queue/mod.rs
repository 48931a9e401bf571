//! Queue backends.

pub mod memory;

pub use memory::InMemoryQueue;

use crate::core::{ScheduledTask, TaskId};

/// Abstraction for not-yet-started task storage.
///
/// Implementations must hand tasks out highest priority first, FIFO within
/// a priority.
pub trait TaskQueue<P> {
    /// Append a task behind every queued task of equal or higher priority.
    fn enqueue(&mut self, task: ScheduledTask<P>);
    /// Remove and return the next task to start.
    fn dequeue(&mut self) -> Option<ScheduledTask<P>>;
    /// Remove a specific queued task.
    fn remove(&mut self, id: TaskId) -> Option<ScheduledTask<P>>;
    /// Remove every queued task, in dequeue order.
    fn drain(&mut self) -> Vec<ScheduledTask<P>>;
    /// Current depth.
    fn len(&self) -> usize;
    /// True when nothing is queued.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
