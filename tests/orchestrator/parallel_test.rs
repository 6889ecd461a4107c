/*!
 * Parallel Execution Tests
 */

use crate::common::{failing, missing, orchestrator, sleeper};
use pretty_assertions::assert_eq;
use std::time::Duration;
use worker_orchestrator::{Aggregator, ExecutionMode, OrchestratorError, WorkerConfig, WorkerStatus};

#[test]
fn test_total_time_approaches_max() {
    let configs = vec![sleeper("a", 0.5), sleeper("b", 0.5), sleeper("c", 0.5)];
    let run = orchestrator().run_parallel(&configs).unwrap();

    assert_eq!(run.mode, ExecutionMode::Parallel);
    assert_eq!(run.spawned(), 3);
    assert!(run.total_duration >= Duration::from_millis(500));
    assert!(run.total_duration < Duration::from_millis(1200));
    assert!(run.workers.iter().all(|w| w.result.is_success()));
}

#[test]
fn test_workers_overlap() {
    let configs = vec![sleeper("a", 0.3), sleeper("b", 0.3)];
    let run = orchestrator().run_parallel(&configs).unwrap();

    // The second worker starts before the first one ends
    assert!(run.workers[1].started_at < run.workers[0].ended_at.unwrap());
}

#[test]
fn test_results_keep_config_order_regardless_of_finish_order() {
    let configs = vec![sleeper("slow", 0.3), sleeper("fast", 0.05), sleeper("mid", 0.15)];
    let run = orchestrator().run_parallel(&configs).unwrap();

    let ids: Vec<&str> = run.workers.iter().map(|w| w.config.id.as_str()).collect();
    assert_eq!(ids, vec!["slow", "fast", "mid"]);
}

#[test]
fn test_failure_is_isolated() {
    let configs = vec![sleeper("a", 0.1), failing("b"), sleeper("c", 0.1)];
    let run = orchestrator().run_parallel(&configs).unwrap();

    assert!(run.workers[0].result.is_success());
    assert!(run.workers[2].result.is_success());
    match &run.workers[1].result.status {
        WorkerStatus::Failed {
            exit_code, error, ..
        } => {
            assert_eq!(*exit_code, Some(1));
            assert_eq!(error, "bad input");
        }
        other => panic!("expected failure, got {:?}", other),
    }

    let counts = Aggregator::status_counts(&run.report());
    assert_eq!(counts.get("succeeded"), Some(&2));
    assert_eq!(counts.get("failed"), Some(&1));
}

#[test]
fn test_spawn_failure_recorded_in_slot() {
    let configs = vec![missing("ghost"), sleeper("real", 0.05)];
    let run = orchestrator().run_parallel(&configs).unwrap();

    assert_eq!(run.workers.len(), 2);
    assert_eq!(run.spawned(), 1);
    assert!(!run.workers[0].was_spawned());
    assert_eq!(run.workers[0].config.id, "ghost");
    assert!(run.workers[0].metrics.insufficient_samples);
    assert!(run.workers[1].result.is_success());
}

#[test]
fn test_nothing_spawned() {
    let err = orchestrator()
        .run_parallel(&[missing("a"), missing("b")])
        .unwrap_err();
    assert_eq!(err, OrchestratorError::NoWorkerSpawned { attempted: 2 });
}

#[test]
fn test_invalid_batch_rejected_before_spawning() {
    let configs = vec![sleeper("dup", 0.0), sleeper("dup", 0.0)];
    let err = orchestrator().run_parallel(&configs).unwrap_err();
    assert!(matches!(err, OrchestratorError::InvalidConfig(_)));

    let err = orchestrator().run_parallel(&Vec::<WorkerConfig>::new()).unwrap_err();
    assert_eq!(err, OrchestratorError::EmptyBatch);
}

#[test]
fn test_timeout_in_parallel_batch() {
    let configs = vec![
        sleeper("quick", 0.05),
        WorkerConfig::new("hang", "sleep")
            .with_args(["10"])
            .with_timeout(Duration::from_millis(200)),
    ];
    let run = orchestrator().run_parallel(&configs).unwrap();

    assert!(run.workers[0].result.is_success());
    assert_eq!(run.workers[1].result.status, WorkerStatus::Timeout { after_ms: 200 });
    assert!(run.total_duration < Duration::from_secs(5));
}
