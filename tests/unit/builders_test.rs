//! Tests for builder modules

use std::future::Future;

use prometheus_request_gate::builders::{build_gate, build_schedulers, build_trip_on_any_gate};
use prometheus_request_gate::config::GateConfig;
use prometheus_request_gate::core::{
    AttemptState, RemoteError, RequestGate, SchedulerError, Spawn, TaskError,
};

#[derive(Clone)]
struct TestSpawner;

impl Spawn for TestSpawner {
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tokio::spawn(fut);
    }
}

const CONFIG: &str = r#"{
    "schedulers": {
        "remote": { "concurrency_limit": 2 },
        "local": { "concurrency_limit": 8, "default_priority": "high" }
    },
    "categories": {
        "contracted_hours": { "scheduler": "remote" },
        "member_costs": { "scheduler": "remote", "policy": "classified" },
        "products": { "scheduler": "local", "cool_down_secs": 60 }
    }
}"#;

fn config() -> GateConfig {
    GateConfig::from_json_str(CONFIG).unwrap()
}

#[tokio::test]
async fn test_build_schedulers_named_by_key() {
    let schedulers = build_schedulers(&config(), TestSpawner).unwrap();

    assert_eq!(schedulers.len(), 2);
    assert_eq!(schedulers["remote"].name(), "remote");
    assert_eq!(schedulers["remote"].concurrency_limit(), 2);
    assert_eq!(schedulers["local"].concurrency_limit(), 8);
}

#[tokio::test]
async fn test_build_schedulers_rejects_invalid_config() {
    let err = build_schedulers(&GateConfig::default(), TestSpawner).unwrap_err();
    assert!(matches!(err, SchedulerError::InvalidConfig(_)));
}

#[tokio::test]
async fn test_gates_share_configured_scheduler() {
    let cfg = config();
    let schedulers = build_schedulers(&cfg, TestSpawner).unwrap();

    let hours: RequestGate<u64, RemoteError, _> =
        build_gate(&cfg, "contracted_hours", &schedulers).unwrap();
    let costs: RequestGate<u64, RemoteError, _> =
        build_gate(&cfg, "member_costs", &schedulers).unwrap();
    let products: RequestGate<String, RemoteError, _> =
        build_gate(&cfg, "products", &schedulers).unwrap();

    assert_eq!(hours.scheduler().name(), "remote");
    assert_eq!(costs.scheduler().name(), "remote");
    assert_eq!(products.scheduler().name(), "local");
    assert_eq!(hours.registry().name(), "contracted_hours");
    assert_eq!(
        products.registry().cool_down(),
        Some(std::time::Duration::from_secs(60))
    );
}

#[tokio::test]
async fn test_built_policy_follows_config() {
    let cfg = config();
    let schedulers = build_schedulers(&cfg, TestSpawner).unwrap();
    let hours: RequestGate<u64, RemoteError, _> =
        build_gate(&cfg, "contracted_hours", &schedulers).unwrap();
    let costs: RequestGate<u64, RemoteError, _> =
        build_gate(&cfg, "member_costs", &schedulers).unwrap();

    let network = || async { Err::<u64, RemoteError>(RemoteError::Network("reset".into())) };

    let outcome = hours.guarded_submit_default(1, network).wait().await;
    assert!(matches!(outcome, Some(Err(TaskError::Operation(_)))));
    assert_eq!(hours.registry().check(&1), AttemptState::CoolingDown);

    let outcome = costs.guarded_submit_default(1, network).wait().await;
    assert!(matches!(outcome, Some(Err(TaskError::Operation(_)))));
    assert_eq!(costs.registry().check(&1), AttemptState::Ready);
}

#[tokio::test]
async fn test_unknown_category() {
    let cfg = config();
    let schedulers = build_schedulers(&cfg, TestSpawner).unwrap();

    let err = build_gate::<u64, RemoteError, _>(&cfg, "timesheets", &schedulers).unwrap_err();
    assert!(matches!(err, SchedulerError::UnknownCategory(name) if name == "timesheets"));
}

#[tokio::test]
async fn test_missing_scheduler_instance() {
    let cfg = config();
    let mut schedulers = build_schedulers(&cfg, TestSpawner).unwrap();
    schedulers.remove("local");

    let err = build_gate::<String, RemoteError, _>(&cfg, "products", &schedulers).unwrap_err();
    assert!(matches!(err, SchedulerError::UnknownScheduler(name) if name == "local"));
}

#[tokio::test]
async fn test_trip_on_any_gate_for_plain_errors() {
    let cfg = config();
    let schedulers = build_schedulers(&cfg, TestSpawner).unwrap();
    let hours: RequestGate<u64, String, _> =
        build_trip_on_any_gate(&cfg, "contracted_hours", &schedulers).unwrap();

    let outcome = hours
        .guarded_submit_default(3, || async { Err::<u64, String>("HTTP 503".into()) })
        .wait()
        .await;
    assert_eq!(outcome, Some(Err(TaskError::Operation("HTTP 503".to_string()))));
    assert_eq!(hours.registry().check(&3), AttemptState::CoolingDown);

    let err = build_trip_on_any_gate::<u64, String, _>(&cfg, "member_costs", &schedulers)
        .unwrap_err();
    assert!(matches!(err, SchedulerError::InvalidConfig(msg) if msg.contains("member_costs")));
}
