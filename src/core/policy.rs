//! Failure classification for the circuit-breaker registry.
//!
//! The scheduler never interprets failures. Classification into
//! "transient" and "non-retryable" happens here and is consumed only by
//! the registry layer.

use thiserror::Error;

use super::error::TaskError;
use super::registry::FailureKind;

/// Maps a task failure to the registry's view of it.
pub trait FailurePolicy<E>: Send + Sync {
    /// Classify a failure delivered through a task handle.
    fn classify(&self, error: &TaskError<E>) -> FailureKind;
}

/// Conservative policy: any failure except cancellation trips the key for
/// the rest of the session.
#[derive(Debug, Clone, Copy, Default)]
pub struct TripOnAnyFailure;

impl<E> FailurePolicy<E> for TripOnAnyFailure {
    fn classify(&self, error: &TaskError<E>) -> FailureKind {
        match error {
            TaskError::Cancelled => FailureKind::Transient,
            _ => FailureKind::NonRetryable,
        }
    }
}

/// Errors that know whether retrying could help.
pub trait Classify {
    /// Kind of failure this error represents.
    fn failure_kind(&self) -> FailureKind;
}

/// Stricter policy that only trips on errors classified as permanent.
///
/// Panics trip the key; timeouts and cancellations do not.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassifiedPolicy;

impl<E: Classify> FailurePolicy<E> for ClassifiedPolicy {
    fn classify(&self, error: &TaskError<E>) -> FailureKind {
        match error {
            TaskError::Operation(e) => e.failure_kind(),
            TaskError::Panicked(_) => FailureKind::NonRetryable,
            TaskError::TimedOut(_) | TaskError::Cancelled => FailureKind::Transient,
        }
    }
}

/// Error shape for remote-data lookups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// Caller is not authenticated.
    #[error("unauthorized")]
    Unauthorized,
    /// Caller is authenticated but not allowed.
    #[error("forbidden")]
    Forbidden,
    /// The service reported itself unavailable or overloaded.
    #[error("service unavailable")]
    Unavailable,
    /// The request never produced a response.
    #[error("network error: {0}")]
    Network(String),
    /// Any other unsuccessful status.
    #[error("unexpected status {0}")]
    Status(u16),
}

impl RemoteError {
    /// Map an HTTP-style status code to an error. Success codes map to `None`.
    #[must_use]
    pub const fn from_status(status: u16) -> Option<Self> {
        match status {
            200..=299 => None,
            401 => Some(Self::Unauthorized),
            403 => Some(Self::Forbidden),
            503 => Some(Self::Unavailable),
            other => Some(Self::Status(other)),
        }
    }
}

impl Classify for RemoteError {
    fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Unauthorized | Self::Forbidden | Self::Unavailable => FailureKind::NonRetryable,
            Self::Network(_) | Self::Status(_) => FailureKind::Transient,
        }
    }
}
