/*!
 * Metric Sampler
 * Fixed-interval polling of one process's CPU and resident memory
 *
 * Each sampler owns one polling thread. The thread ends on its own when the
 * process is observed to have exited, or when `stop` is called. Dropping a
 * sampler stops and joins the thread.
 */

use super::probe::{ProbeError, ProcessProbe, ProcessReading};
use super::types::{MetricSample, SampledMetrics};
use crate::core::errors::{OrchestratorError, Result};
use crate::core::limits::MIN_SAMPLE_INTERVAL;
use crate::core::types::Pid;
use flume::{RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, warn};

/// What the polling thread returns when it ends
struct SamplerTrace {
    samples: Vec<MetricSample>,
    last_observed: Instant,
}

/// Polls one live process until it exits or is stopped
pub struct MetricSampler {
    pid: Pid,
    started: Instant,
    latest: Arc<Mutex<Option<MetricSample>>>,
    stop_tx: Option<Sender<()>>,
    worker: Option<JoinHandle<SamplerTrace>>,
}

impl MetricSampler {
    /// Start polling `pid` every `interval`
    ///
    /// A baseline reading is taken synchronously; it primes the CPU counter
    /// and is not itself a sample. Fails with `ProcessNotFound` when the
    /// process is already gone.
    pub fn start(pid: Pid, interval: Duration, probe: Arc<dyn ProcessProbe>) -> Result<Self> {
        let interval = interval.max(MIN_SAMPLE_INTERVAL);
        let started = Instant::now();

        let baseline = match probe.read(pid) {
            Ok(reading) => reading,
            Err(ProbeError::Exited(_)) => return Err(OrchestratorError::ProcessNotFound(pid)),
            Err(e) => return Err(OrchestratorError::MetricsUnavailable(e.to_string())),
        };

        let latest = Arc::new(Mutex::new(None));
        let published = Arc::clone(&latest);

        let (stop_tx, stop_rx) = flume::bounded::<()>(1);
        let worker = thread::Builder::new()
            .name(format!("sampler-{}", pid))
            .spawn(move || {
                let mut samples = Vec::new();
                let mut previous = baseline;
                let mut last_observed = started;

                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }

                    match probe.read(pid) {
                        Ok(reading) => {
                            let now = Instant::now();
                            let sample = next_sample(&previous, &reading, now - last_observed);
                            *published.lock() = Some(sample);
                            samples.push(sample);
                            previous = reading;
                            last_observed = now;
                        }
                        Err(ProbeError::Exited(_)) => {
                            debug!(pid, samples = samples.len(), "Sampled process exited");
                            break;
                        }
                        Err(e) => {
                            warn!(pid, error = %e, "Sampling aborted");
                            break;
                        }
                    }
                }

                SamplerTrace {
                    samples,
                    last_observed,
                }
            })?;

        debug!(pid, interval_ms = interval.as_millis() as u64, "Sampler started");

        Ok(Self {
            pid,
            started,
            latest,
            stop_tx: Some(stop_tx),
            worker: Some(worker),
        })
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Most recent sample, while the process is still being polled
    pub fn latest(&self) -> Option<MetricSample> {
        *self.latest.lock()
    }

    /// Whether the polling thread has already ended on its own
    pub fn is_finished(&self) -> bool {
        self.worker
            .as_ref()
            .map(|worker| worker.is_finished())
            .unwrap_or(true)
    }

    /// Stop polling and fold the collected samples into a summary
    pub fn stop(mut self) -> SampledMetrics {
        self.finish()
    }

    fn finish(&mut self) -> SampledMetrics {
        if let Some(stop_tx) = self.stop_tx.take() {
            // The thread may have ended already and dropped its receiver
            let _ = stop_tx.try_send(());
        }

        let Some(worker) = self.worker.take() else {
            return SampledMetrics::insufficient();
        };

        match worker.join() {
            Ok(trace) => {
                let monitored = trace.last_observed.saturating_duration_since(self.started);
                let metrics = SampledMetrics::from_samples(trace.samples, monitored);
                if metrics.summary.insufficient_samples {
                    debug!(pid = self.pid, "Process exited before the first sample");
                }
                metrics
            }
            Err(_) => {
                warn!(pid = self.pid, "Sampler thread panicked; metrics discarded");
                SampledMetrics::insufficient()
            }
        }
    }
}

impl Drop for MetricSampler {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.finish();
        }
    }
}

/// Build one sample from two consecutive readings
fn next_sample(previous: &ProcessReading, current: &ProcessReading, wall: Duration) -> MetricSample {
    let cpu_delta = current.cpu_time.saturating_sub(previous.cpu_time);
    let cpu_percent = if wall.is_zero() {
        0.0
    } else {
        cpu_delta.as_secs_f64() / wall.as_secs_f64() * 100.0
    };

    MetricSample {
        timestamp: SystemTime::now(),
        interval: wall,
        cpu_percent,
        rss_bytes: current.rss_bytes,
    }
}
