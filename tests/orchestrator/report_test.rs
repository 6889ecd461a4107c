/*!
 * Report Persistence Tests
 */

use pretty_assertions::assert_eq;
use serde_json::json;
use std::fs;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;
use worker_orchestrator::report::{render_comparison, render_report};
use worker_orchestrator::{
    Aggregator, Comparison, CompletedWorker, ExecutionMode, ExecutionReport, JsonFileSink,
    MetricSummary, ReportSink, WorkerConfig, WorkerResult,
};

fn completed(id: &str, secs: u64, peak_rss_mib: u64) -> CompletedWorker {
    CompletedWorker {
        config: WorkerConfig::new(id, "python3").with_args(["worker.py"]),
        os_pid: Some(1000),
        started_at: SystemTime::now(),
        ended_at: Some(SystemTime::now()),
        duration: Duration::from_secs(secs),
        exit_code: Some(0),
        result: WorkerResult::succeeded(json!({"id": id})),
        metrics: MetricSummary {
            peak_rss_bytes: peak_rss_mib * 1024 * 1024,
            avg_cpu_percent: 95.0,
            peak_cpu_percent: 100.0,
            sample_count: 10,
            monitored: Duration::from_secs(secs),
            insufficient_samples: false,
        },
        samples: Vec::new(),
    }
}

fn comparison() -> Comparison {
    let workers = vec![completed("a", 2, 100), completed("b", 2, 200)];
    let parallel = Aggregator::build_report(ExecutionMode::Parallel, &workers, Duration::from_secs(2));
    let sequential = Aggregator::build_report(ExecutionMode::Sequential, &workers, Duration::from_secs(4));
    Comparison::new(parallel, sequential).unwrap()
}

#[test]
fn test_comparison_files_written() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("out");
    let sink = JsonFileSink::new(&out);

    let comparison = comparison();
    sink.persist_comparison(&comparison).unwrap();

    assert!(out.join("results_parallel.json").exists());
    assert!(out.join("results_sequential.json").exists());

    let text = fs::read_to_string(out.join(JsonFileSink::REPORT_FILE)).unwrap();
    assert!(text.contains("Speedup (seq/par)         : 2.0000x"));
    assert!(text.contains("PARALLEL METRICS"));
    assert!(text.contains("SEQUENTIAL METRICS"));
}

#[test]
fn test_results_file_reads_back() {
    let dir = TempDir::new().unwrap();
    let sink = JsonFileSink::new(dir.path());
    let comparison = comparison();
    sink.persist_comparison(&comparison).unwrap();

    let content = fs::read_to_string(sink.results_path(&comparison.parallel)).unwrap();
    let report: ExecutionReport = serde_json::from_str(&content).unwrap();

    assert_eq!(report.id, comparison.parallel.id);
    assert_eq!(report.mode, ExecutionMode::Parallel);
    assert_eq!(report.total_duration, Duration::from_secs(2));
    assert_eq!(report.config_ids(), comparison.parallel.config_ids());
    assert_eq!(report.entries[1].result, WorkerResult::succeeded(json!({"id": "b"})));
    assert_eq!(report.summary.workers, 2);
}

#[test]
fn test_single_report_written() {
    let dir = TempDir::new().unwrap();
    let sink = JsonFileSink::new(dir.path());
    let report = comparison().sequential;

    sink.persist_report(&report).unwrap();

    assert!(dir.path().join("results_sequential.json").exists());
    assert!(!dir.path().join("results_parallel.json").exists());
    let text = fs::read_to_string(dir.path().join("report.txt")).unwrap();
    assert_eq!(text, render_report(&report));
}

#[test]
fn test_text_report_lists_workers() {
    let report = comparison().parallel;
    let text = render_report(&report);

    assert!(text.starts_with("=== ORCHESTRATION REPORT ==="));
    assert!(text.contains("Parallel total wall time: 2.000000 sec"));
    assert!(text.contains("a: succeeded"));
    assert!(text.contains("b: succeeded"));
    assert!(text.contains("rss_peak_max_mb: 200.0000"));
    assert!(text.contains("rss_peak_avg_mb: 150.0000"));
    assert!(text.contains("compute_time_avg_sec: 0.000000 (0 reported)"));
}

#[test]
fn test_comparison_summary_in_text() {
    let text = render_comparison(&comparison());
    assert!(text.contains("Parallel total wall time  : 2.000000 sec"));
    assert!(text.contains("Sequential total wall time: 4.000000 sec"));
}
