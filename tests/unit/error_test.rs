//! Tests for error types

use std::time::Duration;

use prometheus_request_gate::core::{RemoteError, SchedulerError, TaskError};

#[test]
fn test_invalid_config_error() {
    let err = SchedulerError::InvalidConfig("concurrency_limit must be greater than 0".into());
    assert_eq!(
        err.to_string(),
        "invalid config: concurrency_limit must be greater than 0"
    );
}

#[test]
fn test_unknown_names() {
    assert_eq!(
        SchedulerError::UnknownScheduler("remote".into()).to_string(),
        "unknown scheduler: remote"
    );
    assert_eq!(
        SchedulerError::UnknownCategory("products".into()).to_string(),
        "unknown category: products"
    );
}

#[test]
fn test_task_error_wraps_remote_error() {
    let err: TaskError<RemoteError> = TaskError::Operation(RemoteError::Unavailable);
    assert_eq!(err.to_string(), "operation failed: service unavailable");
    assert_eq!(err.operation_error(), Some(&RemoteError::Unavailable));

    let err: TaskError<RemoteError> = TaskError::Panicked("index out of bounds".into());
    assert_eq!(err.to_string(), "operation panicked: index out of bounds");

    let err: TaskError<RemoteError> = TaskError::TimedOut(Duration::from_secs(2));
    assert_eq!(err.to_string(), "operation timed out after 2s");
}

#[test]
fn test_remote_error_display() {
    assert_eq!(RemoteError::Status(418).to_string(), "unexpected status 418");
    assert_eq!(
        RemoteError::Network("dns failure".into()).to_string(),
        "network error: dns failure"
    );
    assert_eq!(RemoteError::from_status(403), Some(RemoteError::Forbidden));
}
