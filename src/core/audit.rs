//! Audit sink implementations.
//!
//! Records scheduling and circuit-breaker decisions so callers can inspect
//! what happened to a request after the fact.

use std::collections::VecDeque;
use std::fmt;

use serde::Serialize;

use crate::util::clock::now_ms;

/// What happened to a task or key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Task accepted into the queue.
    Submit,
    /// Task admitted and started.
    Start,
    /// Task finished successfully.
    Complete,
    /// Task finished with a failure (error, panic or timeout).
    Fail,
    /// Queued task removed before starting.
    Cancel,
    /// Guarded request skipped (in flight or cooling down).
    Skip,
    /// Key moved into the failed set.
    Trip,
    /// Failed-set membership cleared administratively.
    Reset,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Submit => "submit",
            Self::Start => "start",
            Self::Complete => "complete",
            Self::Fail => "fail",
            Self::Cancel => "cancel",
            Self::Skip => "skip",
            Self::Trip => "trip",
            Self::Reset => "reset",
        };
        f.write_str(s)
    }
}

/// Audit event structure.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    /// Event identifier.
    pub event_id: String,
    /// Related task identifier, when the event concerns a task.
    pub task_id: Option<u64>,
    /// Scheduler or category name.
    pub source: String,
    /// Action taken.
    pub action: AuditAction,
    /// Timestamp milliseconds.
    pub created_at_ms: u128,
    /// Additional context (key, failure reason).
    pub detail: Option<String>,
}

/// Audit sink abstraction.
pub trait AuditSink: Send {
    /// Record an audit event.
    fn record(&mut self, event: AuditEvent);
}

/// In-memory audit sink for testing and dev.
pub struct InMemoryAuditSink {
    events: VecDeque<AuditEvent>,
    max_events: usize,
}

impl InMemoryAuditSink {
    /// Create a new in-memory sink with a bounded buffer.
    pub fn new(max_events: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_events),
            max_events,
        }
    }

    /// Retrieve a snapshot of stored events.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.iter().cloned().collect()
    }

    /// Serialize stored events as JSON lines.
    pub fn to_json_lines(&self) -> Result<String, serde_json::Error> {
        let mut out = String::new();
        for event in &self.events {
            out.push_str(&serde_json::to_string(event)?);
            out.push('\n');
        }
        Ok(out)
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&mut self, event: AuditEvent) {
        if self.max_events == 0 {
            return;
        }
        if self.events.len() >= self.max_events {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}

/// Helper to build an audit event from context.
pub fn build_audit_event(
    task_id: Option<u64>,
    source: impl Into<String>,
    action: AuditAction,
    detail: Option<String>,
) -> AuditEvent {
    AuditEvent {
        event_id: uuid::Uuid::new_v4().to_string(),
        task_id,
        source: source.into(),
        action,
        created_at_ms: now_ms(),
        detail,
    }
}
