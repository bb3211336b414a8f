//! Tests for tokio spawner and sampler utilities

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use task_scheduler::core::{AppResult, ResourceUsage, SchedulerEvent, Spawn};
use task_scheduler::runtime::{spawn_sampler_loop, ResourceSample, ResourceSampler, TokioSpawner};
use task_scheduler::util::ManualClock;

use crate::common::{config, scheduler, wait_for};

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

#[test]
fn test_tokio_spawner_outside_runtime() {
    assert!(TokioSpawner::current().is_err());
}

/// Fails every other reading.
struct FlakySampler {
    calls: AtomicU32,
}

#[async_trait]
impl ResourceSampler for FlakySampler {
    async fn sample(&self) -> AppResult<ResourceSample> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n % 2 == 1 {
            anyhow::bail!("sensor unavailable");
        }
        Ok(ResourceSample {
            memory: 12.5,
            cpu: 40.0,
        })
    }
}

#[tokio::test]
async fn test_sampler_loop_reports_usage_until_shutdown() {
    let clock = ManualClock::new(7);
    let scheduler = scheduler(config(1, 4), &clock);
    let mut rx = scheduler.subscribe();
    let sampler = Arc::new(FlakySampler {
        calls: AtomicU32::new(0),
    });

    spawn_sampler_loop(&scheduler, sampler.clone(), Duration::from_millis(5));

    let event = wait_for(&mut rx, |e| e.name() == "resource-usage-updated").await;
    let SchedulerEvent::ResourceUsageUpdated(usage) = event else {
        panic!("unexpected event");
    };
    assert_eq!(
        usage,
        ResourceUsage {
            memory: 12.5,
            cpu: 40.0,
            reported_at_ms: Some(7),
        }
    );
    assert_eq!(scheduler.resource_usage(), usage);

    // Failed readings keep the last snapshot.
    while sampler.calls.load(Ordering::SeqCst) < 2 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(scheduler.resource_usage(), usage);

    scheduler.shutdown();
    tokio::time::sleep(Duration::from_millis(20)).await;
    let calls = sampler.calls.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(sampler.calls.load(Ordering::SeqCst), calls);
}
