/*!
 * Process Executor
 * Handles OS-level process spawning, waiting and termination
 */

use super::types::WorkerConfig;
use crate::core::errors::{OrchestratorError, Result};
use crate::core::limits::WAIT_POLL_INTERVAL;
use crate::core::types::Pid;
use std::io;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[cfg(unix)]
use nix::errno::Errno;
#[cfg(unix)]
use nix::sys::signal::{killpg, Signal as UnixSignal};
#[cfg(unix)]
use nix::unistd::Pid as NixPid;

/// Build the OS command for a worker
///
/// The worker inherits the orchestrator's environment; the config's
/// entries override it. stdin is closed, stdout/stderr are piped.
pub fn build_command(config: &WorkerConfig) -> Command {
    let mut cmd = Command::new(&config.command);

    if !config.args.is_empty() {
        cmd.args(&config.args);
    }

    for (key, value) in &config.env {
        cmd.env(key, value);
    }

    if let Some(ref dir) = config.working_dir {
        cmd.current_dir(dir);
    }

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    // Own process group, so a timeout reaches the worker's children too
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    cmd
}

/// Spawn a worker's OS process
pub fn spawn_process(config: &WorkerConfig) -> Result<Child> {
    validate_command(config)?;

    let child = build_command(config)
        .spawn()
        .map_err(|e| OrchestratorError::Spawn {
            config_id: config.id.clone(),
            reason: format!("{}: {}", config.command, e),
        })?;

    info!(
        config_id = %config.id,
        os_pid = child.id(),
        command = %config.command,
        "Spawned worker process"
    );

    Ok(child)
}

/// Wait for the child, giving up at `deadline`
///
/// Returns `Ok(None)` when the deadline passed with the child still running.
pub fn wait_with_deadline(child: &mut Child, deadline: Option<Instant>) -> io::Result<Option<ExitStatus>> {
    let Some(deadline) = deadline else {
        return child.wait().map(Some);
    };

    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }

        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        thread::sleep(WAIT_POLL_INTERVAL.min(deadline - now));
    }
}

/// Terminate a running child: SIGTERM, then SIGKILL after `grace`
///
/// Signals go to the worker's whole process group.
pub fn terminate(child: &mut Child, grace: Duration) -> io::Result<ExitStatus> {
    if signal_group(child, UnixSignal::SIGTERM) {
        if let Some(status) = wait_with_deadline(child, Some(Instant::now() + grace))? {
            debug!(os_pid = child.id(), "Worker exited after SIGTERM");
            return Ok(status);
        }
        warn!(
            os_pid = child.id(),
            grace_ms = grace.as_millis() as u64,
            "Worker ignored SIGTERM; killing"
        );
    }

    kill_now(child)?;
    child.wait()
}

/// SIGKILL the worker's process group, falling back to the child alone
pub fn kill_now(child: &mut Child) -> io::Result<()> {
    if signal_group(child, UnixSignal::SIGKILL) {
        return Ok(());
    }
    match child.kill() {
        Ok(()) => Ok(()),
        // Already exited between the last poll and the kill
        Err(e) if e.kind() == io::ErrorKind::InvalidInput => Ok(()),
        Err(e) => Err(e),
    }
}

/// SIGKILL whatever is left of a reaped worker's process group
///
/// Descendants that outlive the worker would otherwise hold its output
/// pipes open. A group that is already empty is not an error.
#[cfg(unix)]
pub fn kill_group_remnants(pgid: Pid) {
    match killpg(NixPid::from_raw(pgid as i32), UnixSignal::SIGKILL) {
        Ok(()) => debug!(pgid, "Killed processes left behind by worker"),
        Err(Errno::ESRCH) => {}
        Err(e) => warn!(pgid, error = %e, "Failed to clean up worker process group"),
    }
}

#[cfg(not(unix))]
pub fn kill_group_remnants(_pgid: Pid) {}

#[cfg(unix)]
fn signal_group(child: &Child, signal: UnixSignal) -> bool {
    // The worker leads its own group, so its pid is the group id
    match killpg(NixPid::from_raw(child.id() as i32), signal) {
        Ok(_) => true,
        Err(e) => {
            debug!(os_pid = child.id(), signal = %signal, error = %e, "Failed to signal process group");
            false
        }
    }
}

#[cfg(not(unix))]
fn signal_group(_child: &Child, _signal: UnixSignal) -> bool {
    false
}

#[cfg(not(unix))]
#[derive(Debug, Clone, Copy)]
enum UnixSignal {
    SIGTERM,
    SIGKILL,
}

/// Reject configs that can never be spawned
fn validate_command(config: &WorkerConfig) -> Result<()> {
    if config.command.trim().is_empty() {
        return Err(OrchestratorError::Spawn {
            config_id: config.id.clone(),
            reason: "empty command".to_string(),
        });
    }

    let has_nul = config.command.contains('\0')
        || config.args.iter().any(|arg| arg.contains('\0'))
        || config
            .env
            .iter()
            .any(|(k, v)| k.is_empty() || k.contains('=') || k.contains('\0') || v.contains('\0'));
    if has_nul {
        return Err(OrchestratorError::Spawn {
            config_id: config.id.clone(),
            reason: "command, argument or environment contains an invalid character".to_string(),
        });
    }

    Ok(())
}
