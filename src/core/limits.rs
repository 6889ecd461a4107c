/*!
 * Limits and Constants
 *
 * Centralized location for sampling intervals, timeouts and other magic
 * numbers. Grouped by domain.
 */

use std::time::Duration;

// =============================================================================
// SAMPLING
// =============================================================================

/// Default interval between two metric samples of one worker (200ms)
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(200);

/// Smallest accepted sampling interval (10ms)
/// Below this the sampler itself starts to show up in the worker's CPU share
pub const MIN_SAMPLE_INTERVAL: Duration = Duration::from_millis(10);

/// Fallback kernel clock ticks per second when sysconf is unavailable
/// [LINUX-COMPAT] USER_HZ is 100 on every mainstream architecture
pub const FALLBACK_CLOCK_TICKS: u64 = 100;

/// Fallback page size when sysconf is unavailable (4KB)
pub const FALLBACK_PAGE_SIZE: u64 = 4096;

/// Bytes per mebibyte, for report rendering
pub const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

// =============================================================================
// PROCESS LIFECYCLE
// =============================================================================

/// Poll interval while waiting on a worker that has a deadline (10ms)
pub const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Time a timed-out worker gets between SIGTERM and SIGKILL (2s)
pub const DEFAULT_TERMINATION_GRACE: Duration = Duration::from_secs(2);

// =============================================================================
// OUTPUT CAPTURE
// =============================================================================

/// Characters of stdout/stderr kept on a failed or unparseable worker
pub const DEFAULT_OUTPUT_TAIL_CHARS: usize = 300;

/// Message recorded when a worker fails without writing to stderr
pub const WORKER_FAILED_MESSAGE: &str = "worker failed";

/// Payload field holding the worker's own compute time in seconds
pub const DEFAULT_COMPUTE_TIME_KEY: &str = "train_time_sec";
