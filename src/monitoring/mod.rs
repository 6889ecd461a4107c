/*!
 * Process Monitoring
 * Per-process metric sampling and structured tracing
 */

mod probe;
mod sampler;
mod tracer;
mod types;

pub use probe::{parse_stat, ProbeError, ProcessProbe, ProcessReading, ProcfsProbe};
pub use sampler::MetricSampler;
pub use tracer::{generate_batch_id, init_tracing, span_batch, span_worker};
pub use types::{MetricSample, MetricSummary, SampledMetrics};
