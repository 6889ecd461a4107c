//! Result aggregation from completed workers

use crate::core::errors::{OrchestratorError, Result};
use crate::core::limits::DEFAULT_COMPUTE_TIME_KEY;
use crate::core::serde::{duration_secs, is_none, system_time_micros};
use crate::core::types::{ExecutionMode, Pid};
use crate::monitoring::MetricSummary;
use crate::process::{CompletedWorker, WorkerConfig, WorkerResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::time::{Duration, SystemTime};
use tracing::info;
use uuid::Uuid;

/// One worker's line in a report: config, result and metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ReportEntry {
    pub config: WorkerConfig,
    pub result: WorkerResult,
    pub metrics: MetricSummary,
    #[serde(skip_serializing_if = "is_none")]
    pub os_pid: Option<Pid>,
    #[serde(skip_serializing_if = "is_none")]
    pub exit_code: Option<i32>,
    /// Wall time from spawn to reap
    #[serde(with = "duration_secs")]
    pub wall_time: Duration,
}

/// Statistics across all workers of one report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BatchSummary {
    pub workers: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Workers whose metrics are backed by at least one sample
    pub sampled: usize,
    pub rss_peak_max_mib: f64,
    pub rss_peak_avg_mib: f64,
    pub cpu_avg_avg: f64,
    pub cpu_peak_max: f64,
    /// Mean of the compute time the workers reported in their payloads
    pub compute_time_avg_sec: f64,
    /// Workers whose payload carried a compute time
    pub compute_time_reported: usize,
    #[serde(with = "duration_secs")]
    pub wall_time_avg: Duration,
    /// Sum of worker wall times; a sequential batch's total approaches it
    #[serde(with = "duration_secs")]
    pub wall_time_sum: Duration,
    /// Longest worker wall time; a parallel batch's total approaches it
    #[serde(with = "duration_secs")]
    pub wall_time_max: Duration,
}

/// Aggregate of one batch run under one execution mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ExecutionReport {
    pub id: Uuid,
    pub mode: ExecutionMode,
    #[serde(with = "system_time_micros")]
    pub generated_at: SystemTime,
    #[serde(with = "duration_secs")]
    pub total_duration: Duration,
    pub summary: BatchSummary,
    pub entries: Vec<ReportEntry>,
}

impl ExecutionReport {
    /// Config ids covered by this report
    pub fn config_ids(&self) -> BTreeSet<&str> {
        self.entries.iter().map(|entry| entry.config.id.as_str()).collect()
    }

    pub fn entry(&self, config_id: &str) -> Option<&ReportEntry> {
        self.entries.iter().find(|entry| entry.config.id == config_id)
    }

    /// Whether both reports hold the same outcome for every config
    ///
    /// This is the property that makes a parallel/sequential comparison
    /// meaningful: only timing and metrics may differ between modes.
    pub fn results_match(&self, other: &ExecutionReport) -> bool {
        if self.config_ids() != other.config_ids() {
            return false;
        }
        self.entries.iter().all(|entry| {
            other
                .entry(&entry.config.id)
                .map(|theirs| entry.result.same_outcome(&theirs.result))
                .unwrap_or(false)
        })
    }
}

/// Sequential over parallel wall time for the same batch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Speedup {
    #[serde(with = "duration_secs")]
    pub parallel: Duration,
    #[serde(with = "duration_secs")]
    pub sequential: Duration,
    /// 0.0 when the parallel run took no measurable time
    pub ratio: f64,
}

/// A parallel and a sequential report of the same batch, with their speedup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Comparison {
    pub parallel: ExecutionReport,
    pub sequential: ExecutionReport,
    pub speedup: Speedup,
}

impl Comparison {
    pub fn new(parallel: ExecutionReport, sequential: ExecutionReport) -> Result<Self> {
        let speedup = Aggregator::compare(&parallel, &sequential)?;
        Ok(Self {
            parallel,
            sequential,
            speedup,
        })
    }
}

/// Turns completed workers into reports and reports into comparisons
pub struct Aggregator;

impl Aggregator {
    /// Build the report of one batch run
    ///
    /// Entries keep the order of `workers`.
    pub fn build_report(
        mode: ExecutionMode,
        workers: &[CompletedWorker],
        total_duration: Duration,
    ) -> ExecutionReport {
        Self::build_report_with(mode, workers, total_duration, DEFAULT_COMPUTE_TIME_KEY)
    }

    /// Like [`Aggregator::build_report`], reading compute time from `compute_time_key`
    pub fn build_report_with(
        mode: ExecutionMode,
        workers: &[CompletedWorker],
        total_duration: Duration,
        compute_time_key: &str,
    ) -> ExecutionReport {
        let entries: Vec<ReportEntry> = workers
            .iter()
            .map(|worker| ReportEntry {
                config: worker.config.clone(),
                result: worker.result.clone(),
                metrics: worker.metrics,
                os_pid: worker.os_pid,
                exit_code: worker.exit_code,
                wall_time: worker.duration,
            })
            .collect();

        ExecutionReport {
            id: Uuid::new_v4(),
            mode,
            generated_at: SystemTime::now(),
            total_duration,
            summary: Self::summarize_with(&entries, compute_time_key),
            entries,
        }
    }

    /// Speedup of `parallel` over `sequential`
    ///
    /// Fails when the reports were not run in the expected modes or do not
    /// cover the same set of configs.
    pub fn compare(parallel: &ExecutionReport, sequential: &ExecutionReport) -> Result<Speedup> {
        if parallel.mode != ExecutionMode::Parallel || sequential.mode != ExecutionMode::Sequential {
            return Err(OrchestratorError::IncomparableReports(format!(
                "expected parallel and sequential reports, got {} and {}",
                parallel.mode, sequential.mode
            )));
        }

        let parallel_ids = parallel.config_ids();
        let sequential_ids = sequential.config_ids();
        let has_duplicates = parallel_ids.len() != parallel.entries.len()
            || sequential_ids.len() != sequential.entries.len();
        if parallel_ids != sequential_ids || has_duplicates {
            let only_parallel: Vec<&str> = parallel_ids.difference(&sequential_ids).copied().collect();
            let only_sequential: Vec<&str> = sequential_ids.difference(&parallel_ids).copied().collect();
            return Err(OrchestratorError::IncomparableReports(format!(
                "config sets differ (only parallel: {:?}, only sequential: {:?})",
                only_parallel, only_sequential
            )));
        }

        let par_secs = parallel.total_duration.as_secs_f64();
        let ratio = if par_secs > 0.0 {
            sequential.total_duration.as_secs_f64() / par_secs
        } else {
            0.0
        };

        info!(
            speedup = ratio,
            parallel_ms = parallel.total_duration.as_millis() as u64,
            sequential_ms = sequential.total_duration.as_millis() as u64,
            "Compared execution modes"
        );

        Ok(Speedup {
            parallel: parallel.total_duration,
            sequential: sequential.total_duration,
            ratio,
        })
    }

    /// Cross-worker statistics; metrics of unsampled workers are left out
    pub fn summarize(entries: &[ReportEntry]) -> BatchSummary {
        Self::summarize_with(entries, DEFAULT_COMPUTE_TIME_KEY)
    }

    /// Cross-worker statistics, averaging the payload field `compute_time_key`
    pub fn summarize_with(entries: &[ReportEntry], compute_time_key: &str) -> BatchSummary {
        if entries.is_empty() {
            return BatchSummary::default();
        }

        let succeeded = entries.iter().filter(|e| e.result.is_success()).count();
        let sampled: Vec<&MetricSummary> = entries
            .iter()
            .map(|e| &e.metrics)
            .filter(|m| !m.insufficient_samples)
            .collect();

        let rss_peaks: Vec<f64> = sampled.iter().map(|m| m.peak_rss_mib()).collect();
        let cpu_avgs: Vec<f64> = sampled.iter().map(|m| m.avg_cpu_percent).collect();
        let cpu_peaks: Vec<f64> = sampled.iter().map(|m| m.peak_cpu_percent).collect();

        // Only successful workers report a payload
        let compute_times: Vec<f64> = entries
            .iter()
            .filter_map(|e| e.result.payload.as_ref())
            .filter_map(|payload| payload.get(compute_time_key))
            .filter_map(serde_json::Value::as_f64)
            .collect();

        let wall_times: Vec<Duration> = entries.iter().map(|e| e.wall_time).collect();
        let wall_time_sum: Duration = wall_times.iter().sum();
        let wall_time_max = wall_times.iter().max().copied().unwrap_or_default();

        BatchSummary {
            workers: entries.len(),
            succeeded,
            failed: entries.len() - succeeded,
            sampled: sampled.len(),
            rss_peak_max_mib: safe_max(&rss_peaks),
            rss_peak_avg_mib: safe_mean(&rss_peaks),
            cpu_avg_avg: safe_mean(&cpu_avgs),
            cpu_peak_max: safe_max(&cpu_peaks),
            compute_time_avg_sec: safe_mean(&compute_times),
            compute_time_reported: compute_times.len(),
            wall_time_avg: wall_time_sum / entries.len() as u32,
            wall_time_sum,
            wall_time_max,
        }
    }

    /// Group a report's entries by status label
    pub fn status_counts(report: &ExecutionReport) -> HashMap<&'static str, usize> {
        let mut counts = HashMap::new();
        for entry in &report.entries {
            *counts.entry(entry.result.status_label()).or_insert(0) += 1;
        }
        counts
    }
}

fn safe_max(values: &[f64]) -> f64 {
    values.iter().copied().fold(0.0, f64::max)
}

fn safe_mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
