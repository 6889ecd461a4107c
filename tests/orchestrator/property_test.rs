/*!
 * Property Tests
 * Invariants of metric summaries and batch statistics
 */

use proptest::prelude::*;
use serde_json::json;
use std::time::{Duration, SystemTime};
use worker_orchestrator::{
    Aggregator, CompletedWorker, ExecutionMode, MetricSample, MetricSummary, WorkerConfig, WorkerResult,
};

fn sample_strategy() -> impl Strategy<Value = MetricSample> {
    (1u64..500, 0.0f64..800.0, 0u64..(64 * 1024 * 1024 * 1024)).prop_map(|(interval_ms, cpu, rss)| {
        MetricSample {
            timestamp: SystemTime::now(),
            interval: Duration::from_millis(interval_ms),
            cpu_percent: cpu,
            rss_bytes: rss,
        }
    })
}

proptest! {
    #[test]
    fn peak_rss_bounds_every_sample(samples in prop::collection::vec(sample_strategy(), 1..50)) {
        let summary = MetricSummary::from_samples(&samples, Duration::from_secs(1));

        prop_assert_eq!(summary.sample_count, samples.len());
        prop_assert!(!summary.insufficient_samples);
        for sample in &samples {
            prop_assert!(summary.peak_rss_bytes >= sample.rss_bytes);
            prop_assert!(summary.peak_cpu_percent >= sample.cpu_percent);
        }
        prop_assert!(samples.iter().any(|s| s.rss_bytes == summary.peak_rss_bytes));
    }

    #[test]
    fn average_cpu_within_sample_range(samples in prop::collection::vec(sample_strategy(), 1..50)) {
        let summary = MetricSummary::from_samples(&samples, Duration::from_secs(1));
        let min = samples.iter().map(|s| s.cpu_percent).fold(f64::INFINITY, f64::min);
        let max = samples.iter().map(|s| s.cpu_percent).fold(0.0, f64::max);

        prop_assert!(summary.avg_cpu_percent >= min - 1e-6);
        prop_assert!(summary.avg_cpu_percent <= max + 1e-6);
    }

    #[test]
    fn batch_wall_time_statistics(durations in prop::collection::vec(0u64..10_000, 1..20)) {
        let workers: Vec<CompletedWorker> = durations
            .iter()
            .enumerate()
            .map(|(i, ms)| CompletedWorker {
                config: WorkerConfig::new(format!("w{}", i), "true"),
                os_pid: Some(i as u32 + 1),
                started_at: SystemTime::now(),
                ended_at: Some(SystemTime::now()),
                duration: Duration::from_millis(*ms),
                exit_code: Some(0),
                result: WorkerResult::succeeded(json!({})),
                metrics: MetricSummary::insufficient(),
                samples: Vec::new(),
            })
            .collect();

        let report = Aggregator::build_report(ExecutionMode::Sequential, &workers, Duration::from_secs(1));
        let summary = &report.summary;

        prop_assert_eq!(summary.workers, durations.len());
        prop_assert_eq!(summary.sampled, 0);
        prop_assert!(summary.wall_time_max <= summary.wall_time_sum);
        prop_assert!(summary.wall_time_avg <= summary.wall_time_max);
        prop_assert_eq!(summary.wall_time_sum, Duration::from_millis(durations.iter().sum()));
    }
}
