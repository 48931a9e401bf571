//! In-memory queue with one FIFO lane per priority.

use std::collections::VecDeque;

use crate::core::{Priority, ScheduledTask, TaskId};

use super::TaskQueue;

/// In-memory queue storing scheduled tasks in per-priority lanes.
///
/// Enqueue and dequeue are O(1); removal by id is O(n) in the lane.
/// High-priority tasks jump every queued normal task but stay behind
/// high-priority tasks that were queued earlier.
pub struct InMemoryQueue<P> {
    high: VecDeque<ScheduledTask<P>>,
    normal: VecDeque<ScheduledTask<P>>,
}

impl<P> InMemoryQueue<P> {
    /// Create an empty queue.
    pub const fn new() -> Self {
        Self {
            high: VecDeque::new(),
            normal: VecDeque::new(),
        }
    }

    /// Number of queued tasks with the given priority.
    pub fn len_of(&self, priority: Priority) -> usize {
        self.lane(priority).len()
    }

    /// Peek at the metadata of the next task to start.
    pub fn peek(&self) -> Option<&ScheduledTask<P>> {
        self.high.front().or_else(|| self.normal.front())
    }

    const fn lane(&self, priority: Priority) -> &VecDeque<ScheduledTask<P>> {
        match priority {
            Priority::High => &self.high,
            Priority::Normal => &self.normal,
        }
    }

    fn lane_mut(&mut self, priority: Priority) -> &mut VecDeque<ScheduledTask<P>> {
        match priority {
            Priority::High => &mut self.high,
            Priority::Normal => &mut self.normal,
        }
    }
}

impl<P> Default for InMemoryQueue<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> TaskQueue<P> for InMemoryQueue<P> {
    fn enqueue(&mut self, task: ScheduledTask<P>) {
        self.lane_mut(task.meta.priority).push_back(task);
    }

    fn dequeue(&mut self) -> Option<ScheduledTask<P>> {
        self.high.pop_front().or_else(|| self.normal.pop_front())
    }

    fn remove(&mut self, id: TaskId) -> Option<ScheduledTask<P>> {
        for lane in [&mut self.high, &mut self.normal] {
            if let Some(pos) = lane.iter().position(|t| t.meta.id == id) {
                return lane.remove(pos);
            }
        }
        None
    }

    fn drain(&mut self) -> Vec<ScheduledTask<P>> {
        self.high.drain(..).chain(self.normal.drain(..)).collect()
    }

    fn len(&self) -> usize {
        self.high.len() + self.normal.len()
    }
}
