/*!
 * Metric Types
 * Per-process samples and the summary derived from them
 */

use crate::core::limits::BYTES_PER_MIB;
use crate::core::serde::{duration_micros, duration_secs, system_time_micros};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};

/// One observation of a running process
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MetricSample {
    #[serde(with = "system_time_micros")]
    pub timestamp: SystemTime,
    /// Wall time since the previous observation; weights `cpu_percent`
    #[serde(with = "duration_micros")]
    pub interval: Duration,
    /// CPU time over `interval` as a percentage of one core
    pub cpu_percent: f64,
    pub rss_bytes: u64,
}

/// Summary of one worker's sample series, computed once at termination
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MetricSummary {
    pub peak_rss_bytes: u64,
    /// Time-weighted mean of the samples' CPU%
    pub avg_cpu_percent: f64,
    pub peak_cpu_percent: f64,
    pub sample_count: usize,
    #[serde(with = "duration_secs")]
    pub monitored: Duration,
    /// Set when the process exited before a single sample could be taken
    pub insufficient_samples: bool,
}

impl MetricSummary {
    /// Summary for a worker that produced no samples
    pub fn insufficient() -> Self {
        Self {
            peak_rss_bytes: 0,
            avg_cpu_percent: 0.0,
            peak_cpu_percent: 0.0,
            sample_count: 0,
            monitored: Duration::ZERO,
            insufficient_samples: true,
        }
    }

    /// Fold a sample series into its summary
    pub fn from_samples(samples: &[MetricSample], monitored: Duration) -> Self {
        if samples.is_empty() {
            return Self {
                monitored,
                ..Self::insufficient()
            };
        }

        let mut peak_rss_bytes = 0u64;
        let mut peak_cpu_percent = 0.0f64;
        let mut weighted_cpu = 0.0f64;
        let mut total_weight = 0.0f64;

        for sample in samples {
            peak_rss_bytes = peak_rss_bytes.max(sample.rss_bytes);
            peak_cpu_percent = peak_cpu_percent.max(sample.cpu_percent);
            let weight = sample.interval.as_secs_f64();
            weighted_cpu += sample.cpu_percent * weight;
            total_weight += weight;
        }

        // Zero-length intervals only happen with a frozen clock; fall back to a plain mean
        let avg_cpu_percent = if total_weight > 0.0 {
            weighted_cpu / total_weight
        } else {
            samples.iter().map(|s| s.cpu_percent).sum::<f64>() / samples.len() as f64
        };

        Self {
            peak_rss_bytes,
            avg_cpu_percent,
            peak_cpu_percent,
            sample_count: samples.len(),
            monitored,
            insufficient_samples: false,
        }
    }

    pub fn peak_rss_mib(&self) -> f64 {
        self.peak_rss_bytes as f64 / BYTES_PER_MIB
    }
}

/// Everything a sampler hands back when it is stopped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SampledMetrics {
    pub samples: Vec<MetricSample>,
    pub summary: MetricSummary,
}

impl SampledMetrics {
    pub fn insufficient() -> Self {
        Self {
            samples: Vec::new(),
            summary: MetricSummary::insufficient(),
        }
    }

    pub fn from_samples(samples: Vec<MetricSample>, monitored: Duration) -> Self {
        let summary = MetricSummary::from_samples(&samples, monitored);
        Self { samples, summary }
    }
}
