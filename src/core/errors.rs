/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 *
 * Only batch-wide failures are represented here. Failures that belong to a
 * single worker (non-zero exit, unparseable output, timeout) are recorded on
 * that worker's result instead of being returned as errors.
 */

use crate::core::types::Pid;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Orchestrator operation result
pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// Orchestrator errors with serialization support
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum OrchestratorError {
    #[error("Failed to spawn worker '{config_id}': {reason}")]
    #[diagnostic(
        code(orchestrator::spawn_failed),
        help("Check that the worker executable exists and is executable, and that the host has free process slots.")
    )]
    Spawn { config_id: String, reason: String },

    #[error("Process {0} not found")]
    #[diagnostic(
        code(orchestrator::process_not_found),
        help("The process exited before it could be observed. Metrics degrade to insufficient samples.")
    )]
    ProcessNotFound(Pid),

    #[error("Process metrics unavailable: {0}")]
    #[diagnostic(
        code(orchestrator::metrics_unavailable),
        help("The host does not expose per-process CPU and memory counters in a readable form.")
    )]
    MetricsUnavailable(String),

    #[error("Reports cannot be compared: {0}")]
    #[diagnostic(
        code(orchestrator::incomparable_reports),
        help("Compare a parallel and a sequential report built from the same worker configs.")
    )]
    IncomparableReports(String),

    #[error("No worker could be spawned ({attempted} attempted)")]
    #[diagnostic(
        code(orchestrator::no_worker_spawned),
        help("Every spawn in the batch failed. Check the worker command and environment.")
    )]
    NoWorkerSpawned { attempted: usize },

    #[error("Batch contains no worker configs")]
    #[diagnostic(
        code(orchestrator::empty_batch),
        help("Add at least one entry to the batch's workers list.")
    )]
    EmptyBatch,

    #[error("Invalid configuration: {0}")]
    #[diagnostic(
        code(orchestrator::invalid_config),
        help("Review the batch file and command-line settings.")
    )]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    #[diagnostic(
        code(orchestrator::io_error),
        help("Filesystem or I/O operation failed. Check file permissions and disk space.")
    )]
    Io(String),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(orchestrator::serialization_error))]
    Serialization(String),
}

impl OrchestratorError {
    /// Whether this error aborts a whole batch rather than one worker
    pub fn is_batch_fatal(&self) -> bool {
        matches!(
            self,
            OrchestratorError::NoWorkerSpawned { .. }
                | OrchestratorError::EmptyBatch
                | OrchestratorError::InvalidConfig(_)
        )
    }
}

// Implement conversion from std::io::Error
impl From<std::io::Error> for OrchestratorError {
    fn from(err: std::io::Error) -> Self {
        OrchestratorError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for OrchestratorError {
    fn from(err: serde_json::Error) -> Self {
        OrchestratorError::Serialization(err.to_string())
    }
}
