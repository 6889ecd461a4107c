//! Batch execution under one mode

use super::aggregator::{Aggregator, Comparison, ExecutionReport};
use super::builder::OrchestratorBuilder;
use crate::config::{validate_workers, OrchestratorConfig};
use crate::core::errors::{OrchestratorError, Result};
use crate::core::types::ExecutionMode;
use crate::monitoring::{generate_batch_id, span_batch, ProcessProbe, ProcfsProbe};
use crate::process::{CompletedWorker, WorkerConfig, WorkerHandle};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Raw outcome of one batch: every worker, in config order, plus timing
#[derive(Debug, Clone)]
pub struct BatchRun {
    pub mode: ExecutionMode,
    pub workers: Vec<CompletedWorker>,
    pub total_duration: Duration,
    /// Payload field averaged as compute time in the report
    pub compute_time_key: String,
}

impl BatchRun {
    pub fn spawned(&self) -> usize {
        self.workers.iter().filter(|w| w.was_spawned()).count()
    }

    pub fn report(&self) -> ExecutionReport {
        Aggregator::build_report_with(self.mode, &self.workers, self.total_duration, &self.compute_time_key)
    }
}

/// Runs batches of workers sequentially or in parallel
///
/// Owns no state across batches: each run's handles live in a collection
/// scoped to that run.
pub struct Orchestrator {
    config: OrchestratorConfig,
    probe: Arc<dyn ProcessProbe>,
}

impl Orchestrator {
    /// Orchestrator with default settings sampling through `/proc`
    pub fn new() -> Self {
        Self {
            config: OrchestratorConfig::default(),
            probe: Arc::new(ProcfsProbe::new()),
        }
    }

    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    pub(super) fn from_parts(config: OrchestratorConfig, probe: Arc<dyn ProcessProbe>) -> Self {
        Self { config, probe }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Run a batch under `mode`
    pub fn run(&self, mode: ExecutionMode, configs: &[WorkerConfig]) -> Result<BatchRun> {
        match mode {
            ExecutionMode::Parallel => self.run_parallel(configs),
            ExecutionMode::Sequential => self.run_sequential(configs),
        }
    }

    /// Spawn and await workers one at a time, in the given order
    pub fn run_sequential(&self, configs: &[WorkerConfig]) -> Result<BatchRun> {
        validate_workers(configs)?;

        let batch_id = generate_batch_id();
        let span = span_batch(&batch_id, ExecutionMode::Sequential, configs.len());
        let _entered = span.enter();
        info!(batch_id = %batch_id, workers = configs.len(), "Starting sequential batch");

        let started = Instant::now();
        let mut workers = Vec::with_capacity(configs.len());

        for config in configs {
            let completed = match self.spawn(config) {
                Ok(handle) => handle.wait(),
                Err(e) => Self::record_spawn_failure(config, &e),
            };
            workers.push(completed);
        }

        self.finish(ExecutionMode::Sequential, workers, started, &span)
    }

    /// Spawn every worker up front, then await all of them
    ///
    /// One waiter thread per handle; completions are joined back over a
    /// channel in whatever order they happen and slotted by config index.
    pub fn run_parallel(&self, configs: &[WorkerConfig]) -> Result<BatchRun> {
        validate_workers(configs)?;

        let batch_id = generate_batch_id();
        let span = span_batch(&batch_id, ExecutionMode::Parallel, configs.len());
        let _entered = span.enter();
        info!(batch_id = %batch_id, workers = configs.len(), "Starting parallel batch");

        let started = Instant::now();
        let mut slots: Vec<Option<CompletedWorker>> = (0..configs.len()).map(|_| None).collect();
        let mut running = Vec::with_capacity(configs.len());

        for (index, config) in configs.iter().enumerate() {
            match self.spawn(config) {
                Ok(handle) => running.push((index, handle)),
                Err(e) => slots[index] = Some(Self::record_spawn_failure(config, &e)),
            }
        }

        if running.is_empty() {
            warn!(attempted = configs.len(), "No worker could be spawned");
            return Err(OrchestratorError::NoWorkerSpawned {
                attempted: configs.len(),
            });
        }

        let (done_tx, done_rx) = flume::unbounded::<(usize, CompletedWorker)>();
        thread::scope(|scope| {
            for (index, handle) in running {
                let done_tx = done_tx.clone();
                let worker_span = span.clone();
                scope.spawn(move || {
                    let _entered = worker_span.enter();
                    let completed = handle.wait();
                    // The receiver outlives every waiter inside this scope
                    let _ = done_tx.send((index, completed));
                });
            }
            drop(done_tx);

            for (index, completed) in done_rx.iter() {
                slots[index] = Some(completed);
            }
        });

        let workers: Vec<CompletedWorker> = slots.into_iter().flatten().collect();
        self.finish(ExecutionMode::Parallel, workers, started, &span)
    }

    /// Run the batch in parallel, then sequentially, and compare the two
    pub fn run_both(&self, configs: &[WorkerConfig]) -> Result<Comparison> {
        let parallel = self.run_parallel(configs)?.report();
        let sequential = self.run_sequential(configs)?.report();

        if !parallel.results_match(&sequential) {
            warn!("Worker results differ between parallel and sequential runs");
        }

        Comparison::new(parallel, sequential)
    }

    fn spawn(&self, config: &WorkerConfig) -> Result<WorkerHandle> {
        WorkerHandle::spawn(Arc::new(config.clone()), &self.config, Arc::clone(&self.probe))
    }

    fn record_spawn_failure(config: &WorkerConfig, error: &OrchestratorError) -> CompletedWorker {
        warn!(config_id = %config.id, error = %error, "Worker spawn failed; continuing batch");
        CompletedWorker::spawn_failed(config.clone(), error)
    }

    fn finish(
        &self,
        mode: ExecutionMode,
        workers: Vec<CompletedWorker>,
        started: Instant,
        span: &tracing::Span,
    ) -> Result<BatchRun> {
        let total_duration = started.elapsed();
        span.record("total_ms", total_duration.as_millis() as u64);

        let run = BatchRun {
            mode,
            workers,
            total_duration,
            compute_time_key: self.config.compute_time_key.clone(),
        };

        let spawned = run.spawned();
        if spawned == 0 {
            warn!(attempted = run.workers.len(), "No worker could be spawned");
            return Err(OrchestratorError::NoWorkerSpawned {
                attempted: run.workers.len(),
            });
        }

        let failed = run.workers.iter().filter(|w| w.is_failed()).count();
        info!(
            mode = %mode,
            workers = run.workers.len(),
            spawned,
            failed,
            total_ms = total_duration.as_millis() as u64,
            "Batch finished"
        );

        Ok(run)
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}
