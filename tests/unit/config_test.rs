//! Tests for configuration validation

use std::time::Duration;

use prometheus_request_gate::config::scheduler::{
    ENV_CONCURRENCY_LIMIT, ENV_DEFAULT_PRIORITY, ENV_TASK_TIMEOUT_MS,
};
use prometheus_request_gate::config::{FailurePolicyKind, GateConfig, SchedulerConfig};
use prometheus_request_gate::core::Priority;

#[test]
fn test_scheduler_config_validation() {
    assert!(SchedulerConfig::new(1).validate().is_ok());
    assert!(SchedulerConfig::new(0).validate().is_err());
    assert!(SchedulerConfig::new(3).with_name("  ").validate().is_err());
}

#[test]
fn test_scheduler_config_serde_round_trip() {
    let cfg = SchedulerConfig::new(4)
        .with_name("remote")
        .with_task_timeout(Duration::from_secs(10));

    let json = serde_json::to_string(&cfg).unwrap();
    let parsed = SchedulerConfig::from_json_str(&json).unwrap();

    assert_eq!(parsed, cfg);
    assert_eq!(parsed.task_timeout_ms, Some(10_000));
}

// Only this test touches the process environment.
#[test]
fn test_scheduler_config_from_env() {
    std::env::set_var(ENV_CONCURRENCY_LIMIT, "3");
    std::env::set_var(ENV_DEFAULT_PRIORITY, "high");
    std::env::set_var(ENV_TASK_TIMEOUT_MS, "2500");

    let cfg = SchedulerConfig::from_env().unwrap();
    assert_eq!(cfg.concurrency_limit, 3);
    assert_eq!(cfg.default_priority, Priority::High);
    assert_eq!(cfg.task_timeout(), Some(Duration::from_millis(2500)));

    std::env::set_var(ENV_CONCURRENCY_LIMIT, "many");
    let err = SchedulerConfig::from_env().unwrap_err();
    assert!(err.to_string().contains(ENV_CONCURRENCY_LIMIT));

    std::env::set_var(ENV_CONCURRENCY_LIMIT, "0");
    assert!(SchedulerConfig::from_env().is_err());

    std::env::remove_var(ENV_CONCURRENCY_LIMIT);
    std::env::remove_var(ENV_DEFAULT_PRIORITY);
    std::env::remove_var(ENV_TASK_TIMEOUT_MS);

    let cfg = SchedulerConfig::from_env().unwrap();
    assert_eq!(cfg, SchedulerConfig::default());
}

#[test]
fn test_gate_config_defaults_per_category() {
    let cfg = GateConfig::from_json_str(
        r#"{
            "schedulers": { "remote": { "concurrency_limit": 2, "task_timeout_ms": 5000 } },
            "categories": {
                "contracted_hours": { "scheduler": "remote" },
                "products": { "scheduler": "remote", "policy": "trip_on_any", "cool_down_secs": 600 }
            }
        }"#,
    )
    .unwrap();

    assert_eq!(cfg.schedulers["remote"].task_timeout(), Some(Duration::from_secs(5)));
    let hours = &cfg.categories["contracted_hours"].registry;
    assert_eq!(hours.policy, FailurePolicyKind::TripOnAny);
    assert_eq!(hours.cool_down(), None);
    assert_eq!(
        cfg.categories["products"].registry.cool_down(),
        Some(Duration::from_secs(600))
    );
}

#[test]
fn test_gate_config_rejects_unknown_policy() {
    let json = r#"{
        "schedulers": { "remote": {} },
        "categories": { "products": { "scheduler": "remote", "policy": "sometimes" } }
    }"#;
    assert!(GateConfig::from_json_str(json).is_err());
}
