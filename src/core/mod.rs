//! Core scheduling, deduplication and circuit-breaker abstractions.

pub mod audit;
pub mod error;
pub mod gate;
pub mod policy;
pub mod registry;
pub mod runner;
pub mod scheduler;
pub mod stats;
pub mod task;

pub use audit::{build_audit_event, AuditAction, AuditEvent, AuditSink, InMemoryAuditSink};
pub use error::{AppResult, SchedulerError, TaskError, TaskResult};
pub use gate::{RequestGate, SkipReason, Submission};
pub use policy::{Classify, ClassifiedPolicy, FailurePolicy, RemoteError, TripOnAnyFailure};
pub use registry::{AttemptOutcome, AttemptState, FailureKind, Registry};
pub use runner::OperationRunner;
pub use scheduler::{Scheduler, Spawn};
pub use stats::SchedulerStats;
pub use task::{Priority, ScheduledTask, TaskHandle, TaskId, TaskMetadata};
