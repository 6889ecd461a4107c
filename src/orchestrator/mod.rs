//! Batch orchestration: running workers under a mode and aggregating results
//!
//! # Example
//!
//! ```ignore
//! use worker_orchestrator::{Orchestrator, WorkerConfig};
//!
//! let orchestrator = Orchestrator::builder()
//!     .with_sample_interval(Duration::from_millis(200))
//!     .build()?;
//!
//! let comparison = orchestrator.run_both(&configs)?;
//! println!("speedup {:.2}x", comparison.speedup.ratio);
//! ```

mod aggregator;
mod builder;
mod executor;

pub use aggregator::{Aggregator, BatchSummary, Comparison, ExecutionReport, ReportEntry, Speedup};
pub use builder::OrchestratorBuilder;
pub use executor::{BatchRun, Orchestrator};
