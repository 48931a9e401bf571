//! Tests for audit sink

use prometheus_request_gate::core::{build_audit_event, AuditAction, AuditSink, InMemoryAuditSink};

#[test]
fn test_in_memory_audit_sink() {
    let mut sink = InMemoryAuditSink::new(10);

    sink.record(build_audit_event(
        Some(3),
        "remote",
        AuditAction::Fail,
        Some("timed out after 5s".to_string()),
    ));

    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].task_id, Some(3));
    assert_eq!(events[0].source, "remote");
    assert_eq!(events[0].action, AuditAction::Fail);
    assert!(!events[0].event_id.is_empty());
}

#[test]
fn test_audit_sink_overflow() {
    let mut sink = InMemoryAuditSink::new(2);

    for id in 0..3 {
        sink.record(build_audit_event(Some(id), "remote", AuditAction::Submit, None));
    }

    let ids: Vec<_> = sink.events().iter().map(|e| e.task_id).collect();
    assert_eq!(ids, vec![Some(1), Some(2)]);
}

#[test]
fn test_zero_capacity_sink_records_nothing() {
    let mut sink = InMemoryAuditSink::new(0);
    sink.record(build_audit_event(None, "hours", AuditAction::Reset, None));
    assert!(sink.events().is_empty());
}

#[test]
fn test_action_display() {
    assert_eq!(AuditAction::Skip.to_string(), "skip");
    assert_eq!(AuditAction::Trip.to_string(), "trip");
}
