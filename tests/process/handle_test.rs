/*!
 * Worker Handle Tests
 * Spawning, waiting and classifying real worker processes
 */

use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use worker_orchestrator::{
    OrchestratorConfig, OrchestratorError, ProcessProbe, ProcfsProbe, WorkerConfig, WorkerHandle,
    WorkerState, WorkerStatus,
};

fn sh(id: &str, script: &str) -> Arc<WorkerConfig> {
    Arc::new(WorkerConfig::new(id, "sh").with_args(["-c", script]))
}

fn settings() -> OrchestratorConfig {
    OrchestratorConfig::default()
        .with_sample_interval(Duration::from_millis(20))
        .with_termination_grace(Duration::from_millis(500))
}

fn probe() -> Arc<dyn ProcessProbe> {
    Arc::new(ProcfsProbe::new())
}

#[test]
fn test_successful_worker_reports_payload() {
    let config = sh(
        "seed-1",
        r#"echo "loading"; echo '{"seed": 1, "accuracy": 0.5}'"#,
    );
    let handle = WorkerHandle::spawn(config, &settings(), probe()).unwrap();
    assert_eq!(handle.state(), WorkerState::Running);
    assert!(handle.os_pid() > 0);

    let completed = handle.wait();
    assert!(completed.result.is_success());
    assert_eq!(completed.result.payload, Some(json!({"seed": 1, "accuracy": 0.5})));
    assert_eq!(completed.exit_code, Some(0));
    assert_eq!(completed.state(), WorkerState::Terminated);
    assert!(completed.was_spawned());
    assert!(completed.ended_at.is_some());
}

#[test]
fn test_nonzero_exit_is_failure() {
    let config = sh("broken", "echo 'missing dataset' >&2; exit 3");
    let completed = WorkerHandle::spawn(config, &settings(), probe())
        .unwrap()
        .wait();

    assert!(completed.is_failed());
    assert_eq!(completed.exit_code, Some(3));
    match completed.result.status {
        WorkerStatus::Failed {
            exit_code, error, ..
        } => {
            assert_eq!(exit_code, Some(3));
            assert!(error.contains("missing dataset"));
        }
        other => panic!("expected failure, got {:?}", other),
    }
}

#[test]
fn test_unparseable_output_is_flagged() {
    let config = sh("chatty", "echo 'not a json document'");
    let completed = WorkerHandle::spawn(config, &settings(), probe())
        .unwrap()
        .wait();

    assert_eq!(completed.exit_code, Some(0));
    assert!(completed.is_failed());
    match completed.result.status {
        WorkerStatus::ParseError { stdout_tail, .. } => {
            assert!(stdout_tail.contains("not a json document"));
        }
        other => panic!("expected parse error, got {:?}", other),
    }
}

#[test]
fn test_missing_executable_fails_to_spawn() {
    let config = Arc::new(WorkerConfig::new("ghost", "/nonexistent/worker-binary"));
    let err = WorkerHandle::spawn(config, &settings(), probe()).err().unwrap();
    assert!(matches!(err, OrchestratorError::Spawn { ref config_id, .. } if config_id == "ghost"));
}

#[test]
fn test_environment_overrides_reach_worker() {
    let config = Arc::new(
        WorkerConfig::new("env", "sh")
            .with_args(["-c", r#"echo "{\"seed\": $WORKER_SEED}""#])
            .with_env("WORKER_SEED", "7"),
    );
    let completed = WorkerHandle::spawn(config, &settings(), probe())
        .unwrap()
        .wait();

    assert_eq!(completed.result.payload, Some(json!({"seed": 7})));
}

#[test]
fn test_timeout_terminates_worker() {
    let config = Arc::new(
        WorkerConfig::new("slow", "sh")
            .with_args(["-c", "sleep 10; echo '{}'"])
            .with_timeout(Duration::from_millis(200)),
    );
    let completed = WorkerHandle::spawn(config, &settings(), probe())
        .unwrap()
        .wait();

    assert_eq!(completed.result.status, WorkerStatus::Timeout { after_ms: 200 });
    assert!(completed.duration >= Duration::from_millis(200));
    assert!(completed.duration < Duration::from_secs(5));
}

#[test]
fn test_timeout_kills_worker_ignoring_sigterm() {
    let config = Arc::new(
        WorkerConfig::new("stubborn", "sh")
            .with_args(["-c", "trap '' TERM; sleep 10"])
            .with_timeout(Duration::from_millis(100)),
    );
    let settings = settings().with_termination_grace(Duration::from_millis(200));
    let completed = WorkerHandle::spawn(config, &settings, probe()).unwrap().wait();

    assert_eq!(completed.result.status_label(), "timeout");
    assert!(completed.duration < Duration::from_secs(5));
}

#[test]
fn test_default_timeout_applies_without_worker_timeout() {
    let config = sh("slow", "sleep 10");
    let settings = settings().with_default_timeout(Duration::from_millis(150));
    let completed = WorkerHandle::spawn(config, &settings, probe()).unwrap().wait();

    assert_eq!(completed.result.status, WorkerStatus::Timeout { after_ms: 150 });
}

#[cfg(target_os = "linux")]
#[test]
fn test_running_worker_is_sampled() {
    let config = sh("sleeper", "sleep 0.5; echo '{}'");
    let handle = WorkerHandle::spawn(config, &settings(), probe()).unwrap();

    std::thread::sleep(Duration::from_millis(200));
    let live = handle.latest_sample();
    assert!(live.is_some());

    let completed = handle.wait();
    assert!(completed.result.is_success());
    assert!(!completed.metrics.insufficient_samples);
    assert!(completed.metrics.sample_count > 0);
    assert!(completed.metrics.peak_rss_bytes > 0);
    assert_eq!(completed.samples.len(), completed.metrics.sample_count);
    for sample in &completed.samples {
        assert!(sample.rss_bytes <= completed.metrics.peak_rss_bytes);
        assert!(sample.cpu_percent >= 0.0);
    }
}

#[test]
fn test_pretty_printed_result_document() {
    let config = sh("pretty", r#"printf '{\n  "seed": 1,\n  "accuracy": 0.9\n}\n'"#);
    let completed = WorkerHandle::spawn(config, &settings(), probe())
        .unwrap()
        .wait();

    assert!(completed.result.is_success());
    assert_eq!(completed.result.payload, Some(json!({"seed": 1, "accuracy": 0.9})));
}

#[test]
fn test_leftover_background_process_does_not_block_wait() {
    let config = Arc::new(
        WorkerConfig::new("forker", "sh")
            .with_args(["-c", "(sleep 3 &); echo '{}'"])
            .with_timeout(Duration::from_millis(500)),
    );
    let started = std::time::Instant::now();
    let completed = WorkerHandle::spawn(config, &settings(), probe())
        .unwrap()
        .wait();

    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(completed.result.is_success());
    assert!(completed.duration < Duration::from_secs(2));
}
