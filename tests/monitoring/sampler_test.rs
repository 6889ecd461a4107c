/*!
 * Metric Sampler Tests
 * Sampling against scripted probes and against live processes
 */

use mockall::mock;
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use worker_orchestrator::monitoring::{ProbeError, ProcessReading};
use worker_orchestrator::{MetricSampler, OrchestratorError, Pid, ProcessProbe, ProcfsProbe};

mock! {
    pub Probe {}

    impl ProcessProbe for Probe {
        fn read(&self, pid: Pid) -> Result<ProcessReading, ProbeError>;
    }
}

const MIB: u64 = 1024 * 1024;

fn reading(cpu_ms: u64, rss_mib: u64) -> ProcessReading {
    ProcessReading {
        cpu_time: Duration::from_millis(cpu_ms),
        rss_bytes: rss_mib * MIB,
    }
}

/// Probe that replays `readings` in order, then reports the process as exited
fn scripted(readings: Vec<ProcessReading>) -> MockProbe {
    let calls = AtomicUsize::new(0);
    let mut probe = MockProbe::new();
    probe.expect_read().returning(move |pid| {
        let call = calls.fetch_add(1, Ordering::SeqCst);
        readings.get(call).copied().ok_or(ProbeError::Exited(pid))
    });
    probe
}

fn wait_until_finished(sampler: &MetricSampler) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !sampler.is_finished() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn test_exited_before_baseline() {
    let mut probe = MockProbe::new();
    probe
        .expect_read()
        .returning(|pid| Err(ProbeError::Exited(pid)));

    let err = MetricSampler::start(42, Duration::from_millis(10), Arc::new(probe))
        .err()
        .unwrap();
    assert_eq!(err, OrchestratorError::ProcessNotFound(42));
}

#[test]
fn test_unsupported_host() {
    let mut probe = MockProbe::new();
    probe.expect_read().returning(|_| Err(ProbeError::Unsupported));

    let err = MetricSampler::start(42, Duration::from_millis(10), Arc::new(probe))
        .err()
        .unwrap();
    assert!(matches!(err, OrchestratorError::MetricsUnavailable(_)));
}

#[test]
fn test_samples_until_process_exits() {
    // Baseline, then two samples, then the process is gone
    let probe = scripted(vec![reading(0, 10), reading(10, 20), reading(20, 15)]);
    let sampler = MetricSampler::start(7, Duration::from_millis(10), Arc::new(probe)).unwrap();
    assert_eq!(sampler.pid(), 7);

    wait_until_finished(&sampler);
    assert!(sampler.is_finished());
    assert_eq!(sampler.latest().map(|s| s.rss_bytes), Some(15 * MIB));

    let metrics = sampler.stop();
    assert_eq!(metrics.samples.len(), 2);
    assert_eq!(metrics.summary.sample_count, 2);
    assert_eq!(metrics.summary.peak_rss_bytes, 20 * MIB);
    assert!(!metrics.summary.insufficient_samples);
    assert!(metrics.summary.peak_cpu_percent >= metrics.summary.avg_cpu_percent);
    assert!(metrics.summary.monitored > Duration::ZERO);
}

#[test]
fn test_stop_before_first_sample() {
    let mut probe = MockProbe::new();
    probe.expect_read().returning(|_| Ok(reading(0, 1)));

    let sampler = MetricSampler::start(7, Duration::from_secs(10), Arc::new(probe)).unwrap();
    let started = Instant::now();
    let metrics = sampler.stop();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(metrics.samples.is_empty());
    assert!(metrics.summary.insufficient_samples);
    assert_eq!(metrics.summary.peak_rss_bytes, 0);
}

#[test]
fn test_read_error_keeps_collected_samples() {
    let calls = AtomicUsize::new(0);
    let mut probe = MockProbe::new();
    probe.expect_read().returning(move |_| {
        match calls.fetch_add(1, Ordering::SeqCst) {
            0 | 1 => Ok(reading(0, 4)),
            _ => Err(ProbeError::Io("permission denied".to_string())),
        }
    });

    let sampler = MetricSampler::start(7, Duration::from_millis(10), Arc::new(probe)).unwrap();
    wait_until_finished(&sampler);

    let metrics = sampler.stop();
    assert_eq!(metrics.summary.sample_count, 1);
    assert_eq!(metrics.summary.peak_rss_bytes, 4 * MIB);
}

#[test]
fn test_drop_stops_polling() {
    let mut probe = MockProbe::new();
    probe.expect_read().returning(|_| Ok(reading(0, 1)));

    let sampler = MetricSampler::start(7, Duration::from_millis(10), Arc::new(probe)).unwrap();
    std::thread::sleep(Duration::from_millis(30));
    drop(sampler);
}

#[cfg(target_os = "linux")]
#[test]
fn test_samples_live_process() {
    let mut child = std::process::Command::new("sleep")
        .arg("0.5")
        .spawn()
        .unwrap();

    let probe = Arc::new(ProcfsProbe::new());
    let sampler = MetricSampler::start(child.id(), Duration::from_millis(20), probe).unwrap();

    child.wait().unwrap();
    wait_until_finished(&sampler);
    let metrics = sampler.stop();

    assert!(metrics.summary.sample_count > 0);
    assert!(metrics.summary.peak_rss_bytes > 0);
    for sample in &metrics.samples {
        assert!(sample.rss_bytes <= metrics.summary.peak_rss_bytes);
        assert!(sample.cpu_percent >= 0.0);
    }
}
