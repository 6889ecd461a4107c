/*!
 * Worker Types
 * Worker configuration, lifecycle state and reported results
 */

use crate::core::serde::is_none;
use crate::core::types::ConfigId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::mem;
use std::path::PathBuf;
use std::time::Duration;

/// Immutable description of one worker invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct WorkerConfig {
    pub id: ConfigId,
    pub command: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// Overrides applied on top of the orchestrator's own environment
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "is_none")]
    pub working_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "is_none")]
    pub timeout_ms: Option<u64>,
}

impl WorkerConfig {
    pub fn new(id: impl Into<ConfigId>, command: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            command: command.into(),
            args: vec![],
            env: BTreeMap::new(),
            working_dir: None,
            timeout_ms: None,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// Worker lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    /// OS process created, sampler not attached yet
    Spawned,
    /// Process running and being sampled
    Running,
    /// Process reaped; result and metrics are final
    Terminated,
}

/// How a worker ended, as recorded by the orchestrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WorkerStatus {
    /// Exit code 0 and a parseable result document
    Succeeded,
    /// Non-zero exit or killed by a signal
    Failed {
        #[serde(skip_serializing_if = "is_none")]
        exit_code: Option<i32>,
        #[serde(skip_serializing_if = "is_none")]
        signal: Option<i32>,
        error: String,
    },
    /// Exit code 0 but stdout did not hold a result document
    ParseError {
        error: String,
        stdout_tail: String,
        stderr_tail: String,
    },
    /// Deadline expired; the process was terminated
    Timeout { after_ms: u64 },
    /// The OS refused to create the process
    SpawnFailed { error: String },
}

/// Outcome of one worker: its status plus the document it reported
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct WorkerResult {
    #[serde(flatten)]
    pub status: WorkerStatus,
    #[serde(default, skip_serializing_if = "is_none")]
    pub payload: Option<serde_json::Value>,
}

impl WorkerResult {
    pub fn succeeded(payload: serde_json::Value) -> Self {
        Self {
            status: WorkerStatus::Succeeded,
            payload: Some(payload),
        }
    }

    pub fn from_status(status: WorkerStatus) -> Self {
        Self {
            status,
            payload: None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, WorkerStatus::Succeeded)
    }

    pub fn is_failed(&self) -> bool {
        !self.is_success()
    }

    /// Short label for the status, as used in logs and text reports
    pub fn status_label(&self) -> &'static str {
        match self.status {
            WorkerStatus::Succeeded => "succeeded",
            WorkerStatus::Failed { .. } => "failed",
            WorkerStatus::ParseError { .. } => "parse_error",
            WorkerStatus::Timeout { .. } => "timeout",
            WorkerStatus::SpawnFailed { .. } => "spawn_failed",
        }
    }

    /// Same kind of status and identical payload
    ///
    /// Error texts are ignored: they carry pids and timings that differ
    /// between runs of the same computation.
    pub fn same_outcome(&self, other: &WorkerResult) -> bool {
        mem::discriminant(&self.status) == mem::discriminant(&other.status)
            && self.payload == other.payload
    }
}
