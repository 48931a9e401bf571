//! Tests for utility functions

use prometheus_request_gate::core::Priority;
use prometheus_request_gate::util::{init_tracing, now_ms};

#[test]
fn test_priority_ordering() {
    assert!(Priority::High > Priority::Normal);
    assert_eq!(Priority::default(), Priority::Normal);
}

#[test]
fn test_priority_round_trips_through_text() {
    for priority in [Priority::Normal, Priority::High] {
        assert_eq!(priority.to_string().parse::<Priority>(), Ok(priority));
    }
    assert_eq!(
        serde_json::to_string(&Priority::High).unwrap(),
        "\"high\""
    );
}

#[test]
fn test_now_ms_is_monotonic_enough() {
    let first = now_ms();
    let second = now_ms();
    assert!(second >= first);
    assert!(first > 1_600_000_000_000);
}

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing();
    init_tracing();
    tracing::info!("subscriber installed");
}
