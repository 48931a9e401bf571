//! Tests for tokio spawner utilities

use prometheus_request_gate::config::SchedulerConfig;
use prometheus_request_gate::core::{Priority, Scheduler, Spawn};
use prometheus_request_gate::runtime::TokioSpawner;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tokio_spawner_spawn() {
    let spawner = TokioSpawner::new(tokio::runtime::Handle::current());

    let (tx, rx) = tokio::sync::oneshot::channel();
    spawner.spawn(async move {
        tx.send(123).unwrap();
    });

    let result = rx.await.expect("oneshot result");
    assert_eq!(result, 123);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_scheduler_on_multi_thread_runtime() {
    let scheduler = Scheduler::new(SchedulerConfig::new(2), TokioSpawner::current()).unwrap();

    let handles: Vec<_> = (0..8u32)
        .map(|i| scheduler.submit(move || async move { Ok::<u32, String>(i + 1) }, Priority::Normal))
        .collect();

    let results = futures::future::join_all(handles).await;
    let total: u32 = results.into_iter().map(Result::unwrap).sum();
    assert_eq!(total, 36);
    assert!(scheduler.stats().peak_active <= 2);
}
