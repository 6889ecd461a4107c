/*!
 * Worker Handle
 * One spawned worker process paired with its sampler and output capture
 *
 * A handle owns every resource of its worker. `wait` consumes it and
 * returns the immutable `CompletedWorker`; dropping a handle that was never
 * waited on kills and reaps the process and stops its sampler.
 */

use super::executor::{kill_group_remnants, kill_now, spawn_process, terminate, wait_with_deadline};
use super::output::{collect, drain, interpret, ExitOutcome};
use super::types::{WorkerConfig, WorkerResult, WorkerState, WorkerStatus};
use crate::config::OrchestratorConfig;
use crate::core::errors::{OrchestratorError, Result};
use crate::core::serde::{duration_secs, is_none, optional_system_time_micros, system_time_micros};
use crate::core::types::Pid;
use crate::monitoring::{span_worker, MetricSample, MetricSampler, MetricSummary, ProcessProbe, SampledMetrics};
use serde::{Deserialize, Serialize};
use std::process::Child;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, error, info, warn, Span};

/// Runtime record of one live worker
pub struct WorkerHandle {
    config: Arc<WorkerConfig>,
    state: WorkerState,
    child: Option<Child>,
    os_pid: Pid,
    started_at: SystemTime,
    started: Instant,
    sampler: Option<MetricSampler>,
    stdout: Option<JoinHandle<Vec<u8>>>,
    stderr: Option<JoinHandle<Vec<u8>>>,
    timeout: Option<Duration>,
    grace: Duration,
    tail_chars: usize,
    span: Span,
}

impl WorkerHandle {
    /// Create the worker's OS process and start sampling it
    ///
    /// The sampler may attach before the worker reaches its payload; peak
    /// memory is tracked monotonically so nothing is lost.
    pub fn spawn(
        config: Arc<WorkerConfig>,
        settings: &OrchestratorConfig,
        probe: Arc<dyn ProcessProbe>,
    ) -> Result<Self> {
        let span = span_worker(&config.id);
        let _entered = span.enter();

        let started_at = SystemTime::now();
        let started = Instant::now();
        let mut child = spawn_process(&config)?;
        let os_pid = child.id();
        span.record("os_pid", os_pid);

        let mut handle = Self {
            config: Arc::clone(&config),
            state: WorkerState::Spawned,
            stdout: None,
            stderr: None,
            child: None,
            os_pid,
            started_at,
            started,
            sampler: None,
            timeout: config.timeout().or_else(|| settings.default_timeout()),
            grace: settings.termination_grace(),
            tail_chars: settings.output_tail_chars,
            span: span.clone(),
        };

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        handle.child = Some(child);

        // From here on Drop reaps the child on every early return
        if let Some(pipe) = stdout {
            handle.stdout = Some(drain(pipe, &format!("{}-stdout", os_pid)).map_err(|e| {
                OrchestratorError::Spawn {
                    config_id: config.id.clone(),
                    reason: format!("cannot capture stdout: {}", e),
                }
            })?);
        }
        if let Some(pipe) = stderr {
            handle.stderr = Some(drain(pipe, &format!("{}-stderr", os_pid)).map_err(|e| {
                OrchestratorError::Spawn {
                    config_id: config.id.clone(),
                    reason: format!("cannot capture stderr: {}", e),
                }
            })?);
        }

        match MetricSampler::start(os_pid, settings.sample_interval(), probe) {
            Ok(sampler) => handle.sampler = Some(sampler),
            Err(e) => {
                warn!(
                    config_id = %config.id,
                    os_pid,
                    error = %e,
                    insufficient_samples = true,
                    "Sampler not attached"
                );
            }
        }

        handle.state = WorkerState::Running;
        Ok(handle)
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn os_pid(&self) -> Pid {
        self.os_pid
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Latest live sample; `None` before the first one or without a sampler
    pub fn latest_sample(&self) -> Option<MetricSample> {
        self.sampler.as_ref().and_then(MetricSampler::latest)
    }

    /// Block until the worker terminates, then finalize its record
    pub fn wait(mut self) -> CompletedWorker {
        let span = self.span.clone();
        let _entered = span.enter();

        // Once taken, Drop has nothing left to kill
        let exit = match self.child.take() {
            Some(mut child) => self.await_exit(&mut child),
            None => ExitOutcome::Lost("process handle already released".to_string()),
        };

        let ended_at = SystemTime::now();
        let duration = self.started.elapsed();
        self.state = WorkerState::Terminated;

        // Leftover descendants would keep the pipes open past the reap
        kill_group_remnants(self.os_pid);

        let metrics = self
            .sampler
            .take()
            .map(MetricSampler::stop)
            .unwrap_or_else(SampledMetrics::insufficient);

        let stdout = collect(self.stdout.take());
        let stderr = collect(self.stderr.take());
        let result = interpret(&exit, &stdout, &stderr, self.tail_chars);

        info!(
            config_id = %self.config.id,
            os_pid = self.os_pid,
            exit_code = exit.exit_code(),
            status = result.status_label(),
            duration_ms = duration.as_millis() as u64,
            samples = metrics.summary.sample_count,
            "Worker terminated"
        );

        CompletedWorker {
            config: (*self.config).clone(),
            os_pid: Some(self.os_pid),
            started_at: self.started_at,
            ended_at: Some(ended_at),
            duration,
            exit_code: exit.exit_code(),
            result,
            metrics: metrics.summary,
            samples: metrics.samples,
        }
    }

    fn await_exit(&self, child: &mut Child) -> ExitOutcome {
        let deadline = self.timeout.map(|timeout| self.started + timeout);

        match wait_with_deadline(child, deadline) {
            Ok(Some(status)) => ExitOutcome::from(status),
            Ok(None) => {
                let timeout = self.timeout.unwrap_or_default();
                warn!(
                    config_id = %self.config.id,
                    os_pid = self.os_pid,
                    timeout_ms = timeout.as_millis() as u64,
                    "Worker timed out; terminating"
                );
                if let Err(e) = terminate(child, self.grace) {
                    error!(os_pid = self.os_pid, error = %e, "Failed to terminate timed-out worker");
                    let _ = kill_now(child);
                    let _ = child.wait();
                }
                ExitOutcome::TimedOut(timeout)
            }
            Err(e) => {
                error!(os_pid = self.os_pid, error = %e, "Failed to wait for worker");
                let _ = kill_now(child);
                let _ = child.wait();
                ExitOutcome::Lost(format!("wait failed: {}", e))
            }
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        if let Some(child) = self.child.as_mut() {
            if matches!(child.try_wait(), Ok(None)) {
                debug!(os_pid = self.os_pid, "Killing worker released before wait");
                let _ = kill_now(child);
            }
            let _ = child.wait();
            kill_group_remnants(self.os_pid);
        }
        // Sampler and drain threads are stopped by their own Drop / pipe EOF
    }
}

/// Terminated worker: final result, metrics and timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CompletedWorker {
    pub config: WorkerConfig,
    #[serde(skip_serializing_if = "is_none")]
    pub os_pid: Option<Pid>,
    #[serde(with = "system_time_micros")]
    pub started_at: SystemTime,
    #[serde(with = "optional_system_time_micros")]
    pub ended_at: Option<SystemTime>,
    #[serde(with = "duration_secs")]
    pub duration: Duration,
    #[serde(skip_serializing_if = "is_none")]
    pub exit_code: Option<i32>,
    pub result: WorkerResult,
    pub metrics: MetricSummary,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub samples: Vec<MetricSample>,
}

impl CompletedWorker {
    /// Record for a config whose process could not be created
    pub fn spawn_failed(config: WorkerConfig, error: &OrchestratorError) -> Self {
        let now = SystemTime::now();
        Self {
            config,
            os_pid: None,
            started_at: now,
            ended_at: Some(now),
            duration: Duration::ZERO,
            exit_code: None,
            result: WorkerResult::from_status(WorkerStatus::SpawnFailed {
                error: error.to_string(),
            }),
            metrics: MetricSummary::insufficient(),
            samples: Vec::new(),
        }
    }

    pub fn state(&self) -> WorkerState {
        WorkerState::Terminated
    }

    pub fn was_spawned(&self) -> bool {
        self.os_pid.is_some()
    }

    pub fn is_failed(&self) -> bool {
        self.result.is_failed()
    }
}
