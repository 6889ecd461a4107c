/*!
 * Worker Processes
 * Spawning, waiting on and interpreting external worker programs
 */

pub mod executor;
mod handle;
pub mod output;
mod types;

pub use handle::{CompletedWorker, WorkerHandle};
pub use output::ExitOutcome;
pub use types::{WorkerConfig, WorkerResult, WorkerState, WorkerStatus};
