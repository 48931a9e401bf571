//! Error types for scheduler operations and task outcomes.

use std::time::Duration;

use thiserror::Error;

/// Errors produced synchronously by scheduler components.
///
/// These signal misuse (bad configuration, unknown names). Failures of the
/// scheduled operations themselves are never reported here; they travel
/// through the task handle as [`TaskError`].
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Configuration failed validation.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    /// A category referenced a scheduler that was not built.
    #[error("unknown scheduler: {0}")]
    UnknownScheduler(String),
    /// A gate was requested for a category that is not configured.
    #[error("unknown category: {0}")]
    UnknownCategory(String),
    /// Backend-specific failure with context.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Failure delivered through a task handle.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TaskError<E> {
    /// The operation ran and returned an error.
    #[error("operation failed: {0}")]
    Operation(E),
    /// The operation panicked, either while building its future or while running.
    #[error("operation panicked: {0}")]
    Panicked(String),
    /// The operation exceeded the scheduler's execution timeout.
    #[error("operation timed out after {0:?}")]
    TimedOut(Duration),
    /// The task was removed before it started, or the scheduler shut down.
    #[error("task cancelled")]
    Cancelled,
}

impl<E> TaskError<E> {
    /// Returns the operation's own error, if that is what failed.
    pub const fn operation_error(&self) -> Option<&E> {
        match self {
            Self::Operation(e) => Some(e),
            _ => None,
        }
    }

    /// True when the task never ran to completion because it was cancelled.
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Result type delivered by every task handle.
pub type TaskResult<T, E> = Result<T, TaskError<E>>;

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
