/*!
 * Process Probe
 * Read-only access to per-process CPU time and resident memory
 *
 * The procfs implementation parses `/proc/<pid>/stat`. A process in the
 * zombie state has exited but not been reaped yet, so it reads as exited.
 */

use crate::core::limits::{FALLBACK_CLOCK_TICKS, FALLBACK_PAGE_SIZE};
use crate::core::types::Pid;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Cumulative counters of one process at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessReading {
    /// User plus system CPU time since process start
    pub cpu_time: Duration,
    pub rss_bytes: u64,
}

/// Probe errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum ProbeError {
    #[error("Process {0} has exited")]
    #[diagnostic(code(probe::exited))]
    Exited(Pid),

    #[error("Process metrics are not supported on this host")]
    #[diagnostic(
        code(probe::unsupported),
        help("Per-process sampling needs a procfs mounted at /proc.")
    )]
    Unsupported,

    #[error("Failed to read process metrics: {0}")]
    #[diagnostic(code(probe::io))]
    Io(String),
}

/// Source of per-process counters
///
/// Implementations must tolerate the process disappearing between calls
/// and report that as [`ProbeError::Exited`].
pub trait ProcessProbe: Send + Sync {
    fn read(&self, pid: Pid) -> Result<ProcessReading, ProbeError>;
}

/// Probe backed by a procfs mount
#[derive(Debug, Clone)]
pub struct ProcfsProbe {
    root: PathBuf,
    clock_ticks: u64,
    page_size: u64,
}

impl ProcfsProbe {
    /// Probe reading the host's `/proc`
    pub fn new() -> Self {
        Self::with_root("/proc")
    }

    /// Probe reading a procfs-shaped tree rooted elsewhere
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            clock_ticks: host_clock_ticks(),
            page_size: host_page_size(),
        }
    }

    fn stat_path(&self, pid: Pid) -> PathBuf {
        self.root.join(pid.to_string()).join("stat")
    }
}

impl Default for ProcfsProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessProbe for ProcfsProbe {
    fn read(&self, pid: Pid) -> Result<ProcessReading, ProbeError> {
        let content = match std::fs::read_to_string(self.stat_path(pid)) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                if self.root.is_dir() {
                    return Err(ProbeError::Exited(pid));
                }
                return Err(ProbeError::Unsupported);
            }
            // The kernel answers ESRCH when the task vanishes mid-read
            Err(e) if e.raw_os_error() == Some(3) => return Err(ProbeError::Exited(pid)),
            Err(e) => return Err(ProbeError::Io(e.to_string())),
        };

        parse_stat(pid, &content, self.clock_ticks, self.page_size)
    }
}

/// Parse one `/proc/<pid>/stat` line
///
/// The command name is wrapped in parentheses and may itself contain
/// spaces or parentheses, so fields are located after the last `)`.
pub fn parse_stat(
    pid: Pid,
    content: &str,
    clock_ticks: u64,
    page_size: u64,
) -> Result<ProcessReading, ProbeError> {
    let rest = content
        .rfind(')')
        .map(|idx| &content[idx + 1..])
        .ok_or_else(|| ProbeError::Io(format!("malformed stat for pid {}", pid)))?;

    // Index 0 is field 3 (state) of proc(5)
    let fields: Vec<&str> = rest.split_whitespace().collect();
    if fields.len() < 22 {
        return Err(ProbeError::Io(format!(
            "truncated stat for pid {} ({} fields)",
            pid,
            fields.len()
        )));
    }

    if matches!(fields[0], "Z" | "X" | "x") {
        return Err(ProbeError::Exited(pid));
    }

    let utime = parse_field(pid, fields[11], "utime")?;
    let stime = parse_field(pid, fields[12], "stime")?;
    let rss_pages = parse_field(pid, fields[21], "rss")?;

    let ticks = utime.saturating_add(stime);
    let clock_ticks = clock_ticks.max(1);
    let cpu_nanos = (ticks as u128 * 1_000_000_000u128) / clock_ticks as u128;

    Ok(ProcessReading {
        cpu_time: Duration::from_nanos(cpu_nanos.min(u64::MAX as u128) as u64),
        rss_bytes: rss_pages.saturating_mul(page_size),
    })
}

fn parse_field(pid: Pid, raw: &str, name: &str) -> Result<u64, ProbeError> {
    // rss is signed in the kernel's format; a negative value means zero pages
    if raw.starts_with('-') {
        return Ok(0);
    }
    raw.parse::<u64>()
        .map_err(|e| ProbeError::Io(format!("bad {} for pid {}: {}", name, pid, e)))
}

#[cfg(unix)]
fn host_clock_ticks() -> u64 {
    use nix::unistd::{sysconf, SysconfVar};
    match sysconf(SysconfVar::CLK_TCK) {
        Ok(Some(ticks)) if ticks > 0 => ticks as u64,
        _ => FALLBACK_CLOCK_TICKS,
    }
}

#[cfg(not(unix))]
fn host_clock_ticks() -> u64 {
    FALLBACK_CLOCK_TICKS
}

#[cfg(unix)]
fn host_page_size() -> u64 {
    use nix::unistd::{sysconf, SysconfVar};
    match sysconf(SysconfVar::PAGE_SIZE) {
        Ok(Some(size)) if size > 0 => size as u64,
        _ => FALLBACK_PAGE_SIZE,
    }
}

#[cfg(not(unix))]
fn host_page_size() -> u64 {
    FALLBACK_PAGE_SIZE
}
