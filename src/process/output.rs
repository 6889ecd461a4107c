/*!
 * Output Capture
 * Draining child pipes and turning captured output into a WorkerResult
 */

use super::types::{WorkerResult, WorkerStatus};
use crate::core::limits::WORKER_FAILED_MESSAGE;
use std::io::Read;
use std::process::ExitStatus;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::warn;

/// How the process ended, before its output is interpreted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitOutcome {
    Exited(i32),
    Signaled(i32),
    TimedOut(Duration),
    /// Waiting on the process failed; it was killed and reaped
    Lost(String),
}

impl From<ExitStatus> for ExitOutcome {
    fn from(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return ExitOutcome::Exited(code);
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return ExitOutcome::Signaled(signal);
            }
        }

        ExitOutcome::Exited(-1)
    }
}

impl ExitOutcome {
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ExitOutcome::Exited(code) => Some(*code),
            _ => None,
        }
    }
}

/// Read a pipe to its end on a dedicated thread
///
/// Both stdout and stderr are drained concurrently so a chatty worker can
/// never block on a full pipe while the orchestrator waits on its exit.
pub fn drain<R>(mut reader: R, label: &str) -> std::io::Result<JoinHandle<Vec<u8>>>
where
    R: Read + Send + 'static,
{
    let label = label.to_string();
    thread::Builder::new()
        .name(format!("drain-{}", label))
        .spawn(move || {
            let mut buffer = Vec::new();
            if let Err(e) = reader.read_to_end(&mut buffer) {
                warn!(pipe = %label, error = %e, "Pipe read failed; keeping partial output");
            }
            buffer
        })
}

/// Collect a drained pipe, empty when the reader was never started or panicked
pub fn collect(reader: Option<JoinHandle<Vec<u8>>>) -> String {
    reader
        .and_then(|handle| handle.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

/// Parse the worker's result document
///
/// The whole trimmed stdout is tried first, so a document spread over
/// several lines parses. Otherwise the last non-empty line must hold the
/// document and earlier lines are the worker's own logging.
pub fn parse_result_document(stdout: &str) -> Result<serde_json::Value, String> {
    let whole = stdout.trim();
    if whole.is_empty() {
        return Err("worker wrote nothing to stdout".to_string());
    }
    if let Ok(document) = serde_json::from_str(whole) {
        return Ok(document);
    }

    let line = whole
        .lines()
        .map(str::trim)
        .rev()
        .find(|line| !line.is_empty())
        .unwrap_or(whole);

    serde_json::from_str(line).map_err(|e| format!("invalid result document: {}", e))
}

/// Last `max_chars` characters of `text`
pub fn tail(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    if count <= max_chars {
        return text.to_string();
    }
    text.chars().skip(count - max_chars).collect()
}

/// Interpret a terminated worker's exit and output
///
/// Never fails: anything unexpected becomes a flagged result.
pub fn interpret(exit: &ExitOutcome, stdout: &str, stderr: &str, tail_chars: usize) -> WorkerResult {
    match exit {
        ExitOutcome::Exited(0) => match parse_result_document(stdout) {
            Ok(payload) => WorkerResult::succeeded(payload),
            Err(error) => WorkerResult::from_status(WorkerStatus::ParseError {
                error,
                stdout_tail: tail(stdout, tail_chars),
                stderr_tail: tail(stderr, tail_chars),
            }),
        },
        ExitOutcome::Exited(code) => WorkerResult::from_status(WorkerStatus::Failed {
            exit_code: Some(*code),
            signal: None,
            error: failure_message(stderr, tail_chars),
        }),
        ExitOutcome::Signaled(signal) => WorkerResult::from_status(WorkerStatus::Failed {
            exit_code: None,
            signal: Some(*signal),
            error: failure_message(stderr, tail_chars),
        }),
        ExitOutcome::TimedOut(after) => WorkerResult::from_status(WorkerStatus::Timeout {
            after_ms: after.as_millis() as u64,
        }),
        ExitOutcome::Lost(reason) => WorkerResult::from_status(WorkerStatus::Failed {
            exit_code: None,
            signal: None,
            error: reason.clone(),
        }),
    }
}

fn failure_message(stderr: &str, tail_chars: usize) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        WORKER_FAILED_MESSAGE.to_string()
    } else {
        tail(trimmed, tail_chars)
    }
}
