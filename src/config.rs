/*!
 * Configuration
 * Orchestrator settings and the batch file format
 */

use crate::core::errors::{OrchestratorError, Result};
use crate::core::limits::{
    DEFAULT_COMPUTE_TIME_KEY, DEFAULT_OUTPUT_TAIL_CHARS, DEFAULT_SAMPLE_INTERVAL, DEFAULT_TERMINATION_GRACE, MIN_SAMPLE_INTERVAL,
};
use crate::core::serde::is_none;
use crate::process::WorkerConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// Settings shared by every worker of a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct OrchestratorConfig {
    pub sample_interval_ms: u64,
    /// Applied to workers that do not set their own timeout
    #[serde(skip_serializing_if = "is_none")]
    pub default_timeout_ms: Option<u64>,
    pub termination_grace_ms: u64,
    pub output_tail_chars: usize,
    /// Numeric payload field averaged into the batch summary
    pub compute_time_key: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: DEFAULT_SAMPLE_INTERVAL.as_millis() as u64,
            default_timeout_ms: None,
            termination_grace_ms: DEFAULT_TERMINATION_GRACE.as_millis() as u64,
            output_tail_chars: DEFAULT_OUTPUT_TAIL_CHARS,
            compute_time_key: DEFAULT_COMPUTE_TIME_KEY.to_string(),
        }
    }
}

impl OrchestratorConfig {
    pub fn with_sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn with_termination_grace(mut self, grace: Duration) -> Self {
        self.termination_grace_ms = grace.as_millis() as u64;
        self
    }

    pub fn with_output_tail_chars(mut self, chars: usize) -> Self {
        self.output_tail_chars = chars;
        self
    }

    pub fn with_compute_time_key(mut self, key: impl Into<String>) -> Self {
        self.compute_time_key = key.into();
        self
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout_ms.map(Duration::from_millis)
    }

    pub fn termination_grace(&self) -> Duration {
        Duration::from_millis(self.termination_grace_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_interval() < MIN_SAMPLE_INTERVAL {
            return Err(OrchestratorError::InvalidConfig(format!(
                "sample_interval_ms must be at least {}",
                MIN_SAMPLE_INTERVAL.as_millis()
            )));
        }
        if self.default_timeout_ms == Some(0) {
            return Err(OrchestratorError::InvalidConfig(
                "default_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// A batch file: shared settings plus the worker list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BatchFile {
    #[serde(default)]
    pub settings: OrchestratorConfig,
    pub workers: Vec<WorkerConfig>,
}

impl BatchFile {
    /// Load and validate a JSON batch file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| OrchestratorError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let batch: BatchFile = serde_json::from_str(content)
            .map_err(|e| OrchestratorError::InvalidConfig(format!("batch file: {}", e)))?;
        batch.validate()?;
        Ok(batch)
    }

    pub fn validate(&self) -> Result<()> {
        self.settings.validate()?;
        validate_workers(&self.workers)
    }
}

/// Check a worker list before anything is spawned
pub fn validate_workers(workers: &[WorkerConfig]) -> Result<()> {
    if workers.is_empty() {
        return Err(OrchestratorError::EmptyBatch);
    }

    let mut seen = HashSet::with_capacity(workers.len());
    for worker in workers {
        if worker.id.trim().is_empty() {
            return Err(OrchestratorError::InvalidConfig(
                "worker id must not be empty".to_string(),
            ));
        }
        if !seen.insert(worker.id.as_str()) {
            return Err(OrchestratorError::InvalidConfig(format!(
                "duplicate worker id '{}'",
                worker.id
            )));
        }
        if worker.command.trim().is_empty() {
            return Err(OrchestratorError::InvalidConfig(format!(
                "worker '{}' has an empty command",
                worker.id
            )));
        }
        if worker.timeout_ms == Some(0) {
            return Err(OrchestratorError::InvalidConfig(format!(
                "worker '{}' has a zero timeout",
                worker.id
            )));
        }
    }

    Ok(())
}
