/*!
 * Worker Orchestrator Library
 * Launches worker processes, samples their CPU and memory while they run,
 * and compares parallel against sequential execution of the same batch
 */

pub mod config;
pub mod core;
pub mod monitoring;
pub mod orchestrator;
pub mod process;
pub mod report;

// Re-exports
pub use crate::config::{BatchFile, OrchestratorConfig};
pub use crate::core::{ExecutionMode, OrchestratorError, Pid, Result};
pub use monitoring::{init_tracing, MetricSample, MetricSampler, MetricSummary, ProcessProbe, ProcfsProbe};
pub use orchestrator::{
    Aggregator, BatchRun, BatchSummary, Comparison, ExecutionReport, Orchestrator, OrchestratorBuilder,
    ReportEntry, Speedup,
};
pub use process::{CompletedWorker, WorkerConfig, WorkerHandle, WorkerResult, WorkerState, WorkerStatus};
pub use report::{JsonFileSink, ReportSink};
