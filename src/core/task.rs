//! Task model: priorities, queued task envelopes, and pending result handles.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::channel::oneshot;
use serde::{Deserialize, Serialize};

use super::error::{TaskError, TaskResult};

/// Task identifier, unique per scheduler.
pub type TaskId = u64;

/// Queue priority. High-priority tasks start before queued normal ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Regular work, FIFO among itself.
    #[default]
    Normal,
    /// Urgent work, serviced ahead of queued normal tasks.
    High,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => f.write_str("normal"),
            Self::High => f.write_str("high"),
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "high" => Ok(Self::High),
            other => Err(format!("unknown priority `{other}`")),
        }
    }
}

/// Metadata describing a queued task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskMetadata {
    /// Unique task identifier.
    pub id: TaskId,
    /// Priority used for queue ordering.
    pub priority: Priority,
    /// Submission timestamp in milliseconds since epoch.
    pub submitted_at_ms: u128,
}

/// A queued task: metadata plus an opaque payload.
#[derive(Debug)]
pub struct ScheduledTask<P> {
    /// Metadata driving scheduling decisions.
    pub meta: TaskMetadata,
    /// Task payload supplied by the scheduler.
    pub payload: P,
}

pub(crate) type SettleHook<T, E> = Box<dyn FnOnce(&TaskResult<T, E>) + Send>;

/// Exactly-once settlement of a task.
///
/// Holds the settle hook and the handle's sender. If dropped before being
/// settled (task cancelled while queued, scheduler shut down, future dropped
/// by the runtime) it settles with [`TaskError::Cancelled`].
pub(crate) struct Completion<T, E> {
    hook: Option<SettleHook<T, E>>,
    sender: Option<oneshot::Sender<TaskResult<T, E>>>,
}

impl<T, E> Completion<T, E> {
    pub(crate) fn new(
        sender: oneshot::Sender<TaskResult<T, E>>,
        hook: Option<SettleHook<T, E>>,
    ) -> Self {
        Self {
            hook,
            sender: Some(sender),
        }
    }

    /// Run the settle hook. Subsequent calls are no-ops.
    pub(crate) fn run_hook(&mut self, outcome: &TaskResult<T, E>) {
        if let Some(hook) = self.hook.take() {
            hook(outcome);
        }
    }

    /// Run the hook (if still pending) and deliver the outcome to the handle.
    pub(crate) fn deliver(mut self, outcome: TaskResult<T, E>) {
        self.run_hook(&outcome);
        if let Some(sender) = self.sender.take() {
            // Receiver gone means the caller stopped waiting.
            let _ = sender.send(outcome);
        }
    }
}

impl<T, E> Drop for Completion<T, E> {
    fn drop(&mut self) {
        if self.sender.is_none() {
            return;
        }
        let outcome = Err(TaskError::Cancelled);
        self.run_hook(&outcome);
        if let Some(sender) = self.sender.take() {
            let _ = sender.send(outcome);
        }
    }
}

/// Pending result of a submitted task. Resolves exactly once.
///
/// Dropping the handle does not cancel the task; use
/// [`Scheduler::cancel`](crate::core::Scheduler::cancel) for queued work.
#[must_use = "a task handle does nothing unless awaited"]
pub struct TaskHandle<T, E> {
    id: TaskId,
    receiver: oneshot::Receiver<TaskResult<T, E>>,
}

impl<T, E> TaskHandle<T, E> {
    pub(crate) const fn new(id: TaskId, receiver: oneshot::Receiver<TaskResult<T, E>>) -> Self {
        Self { id, receiver }
    }

    /// Identifier of the underlying task.
    pub const fn id(&self) -> TaskId {
        self.id
    }
}

impl<T, E> fmt::Debug for TaskHandle<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle").field("id", &self.id).finish_non_exhaustive()
    }
}

impl<T, E> Future for TaskHandle<T, E> {
    type Output = TaskResult<T, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(oneshot::Canceled)) => Poll::Ready(Err(TaskError::Cancelled)),
            Poll::Pending => Poll::Pending,
        }
    }
}
