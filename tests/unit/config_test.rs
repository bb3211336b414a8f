//! Tests for configuration validation

use task_scheduler::config::SchedulerConfig;
use task_scheduler::core::{ResourceLimits, Scheduler, SchedulerError};
use task_scheduler::runtime::TokioSpawner;

fn limits() -> ResourceLimits {
    ResourceLimits {
        max_concurrent_tasks: 4,
        max_queue_size: 50,
        max_memory_usage: 80.0,
        max_cpu_usage: 80.0,
    }
}

#[test]
fn test_scheduler_config_validation() {
    let valid = SchedulerConfig {
        limits: limits(),
        ..SchedulerConfig::default()
    };
    assert!(valid.validate().is_ok());
}

#[test]
fn test_scheduler_config_invalid_concurrency() {
    let invalid = SchedulerConfig {
        limits: ResourceLimits {
            max_concurrent_tasks: 0,
            ..limits()
        },
        ..SchedulerConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_scheduler_config_invalid_queue_size() {
    let invalid = SchedulerConfig {
        limits: ResourceLimits {
            max_queue_size: 0,
            ..limits()
        },
        ..SchedulerConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_scheduler_config_invalid_cpu_budget() {
    let invalid = SchedulerConfig {
        limits: ResourceLimits {
            max_cpu_usage: f64::NAN,
            ..limits()
        },
        ..SchedulerConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_scheduler_config_invalid_intervals() {
    let invalid = SchedulerConfig {
        admission_interval_ms: 0,
        ..SchedulerConfig::default()
    };
    assert!(invalid.validate().is_err());

    let invalid = SchedulerConfig {
        execution_timeout_ms: Some(0),
        ..SchedulerConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_scheduler_config_from_json() {
    let cfg = SchedulerConfig::from_json_str(
        r#"{
            "limits": {
                "max_concurrent_tasks": 3,
                "max_queue_size": 20,
                "max_memory_usage": 75.0,
                "max_cpu_usage": 60.0
            },
            "retention_ms": 5000,
            "execution_timeout_ms": 30000
        }"#,
    )
    .unwrap();

    assert_eq!(cfg.limits.max_concurrent_tasks, 3);
    assert_eq!(cfg.limits.max_queue_size, 20);
    assert_eq!(cfg.retention_ms, 5_000);
    assert_eq!(cfg.execution_timeout_ms, Some(30_000));
    assert_eq!(cfg.admissions_per_tick, 1);
    assert_eq!(cfg.default_max_retries, 3);
}

#[test]
fn test_scheduler_config_from_json_rejects_invalid() {
    assert!(SchedulerConfig::from_json_str("not json").is_err());
    assert!(SchedulerConfig::from_json_str(r#"{ "admissions_per_tick": 0 }"#).is_err());
}

#[test]
fn test_scheduler_config_from_lookup_rejects_garbage() {
    let err = SchedulerConfig::from_lookup(|key| {
        (key == "TASK_SCHEDULER_MAX_QUEUE_SIZE").then(|| "lots".to_string())
    })
    .unwrap_err();
    assert!(format!("{err:#}").contains("TASK_SCHEDULER_MAX_QUEUE_SIZE"));
}

#[tokio::test]
async fn test_scheduler_rejects_invalid_config() {
    let invalid = SchedulerConfig {
        event_capacity: 0,
        ..SchedulerConfig::default()
    };
    let result = Scheduler::new(invalid, TokioSpawner::current().unwrap());
    assert!(matches!(result, Err(SchedulerError::Config(_))));
}
