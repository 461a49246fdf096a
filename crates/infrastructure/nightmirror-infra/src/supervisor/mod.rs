//! Runs the desktop sync client for the length of a nightly job and makes
//! sure it is killed afterwards.
//!
//! The client is started once, then the supervisor blocks on a
//! [`LivenessChannel`]. An explicit shutdown, the controller hanging up, or
//! the timeout running out all end the wait the same way: the client is
//! killed and reaped before [`supervise_external_process`] returns.

use camino::{Utf8Path, Utf8PathBuf};
use nightmirror_core::ErrorKind;
use std::process::{Command, ExitStatus, Stdio};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

mod liveness;
mod resolve;

pub use liveness::{liveness_pair, LivenessChannel, LivenessSender, PipeLiveness, WakeReason};
pub use resolve::{parse_version, resolve_client_executable, VERSION_COMPONENTS};

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("Supervisor configuration error: {0}")]
    Configuration(String),
    #[error("failed to start {program}: {error}")]
    Spawn {
        program: Utf8PathBuf,
        error: std::io::Error,
    },
    #[error("failed to kill process {pid}: {error}")]
    Kill { pid: u32, error: std::io::Error },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SupervisorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SupervisorError::Configuration(_) => ErrorKind::Configuration,
            SupervisorError::Spawn { .. } | SupervisorError::Kill { .. } | SupervisorError::Io(_) => {
                ErrorKind::Io
            }
        }
    }
}

/// A resolved program plus the arguments it is started with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCommand {
    pub program: Utf8PathBuf,
    pub args: Vec<String>,
}

impl ClientCommand {
    pub fn new(program: impl Into<Utf8PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append arguments given as one shell-quoted string. Blank input adds nothing.
    pub fn with_arg_string(mut self, raw: &str) -> Result<Self, SupervisorError> {
        if raw.trim().is_empty() {
            return Ok(self);
        }
        let parts = shlex::split(raw).ok_or_else(|| {
            SupervisorError::Configuration(format!("cannot parse client arguments: {raw}"))
        })?;
        self.args.extend(parts);
        Ok(self)
    }

    /// The client runs from its own directory, like a desktop shortcut would start it.
    pub fn working_dir(&self) -> &Utf8Path {
        match self.program.parent() {
            Some(parent) if !parent.as_str().is_empty() => parent,
            _ => Utf8Path::new("."),
        }
    }
}

/// How one supervised lifecycle ended.
#[derive(Debug)]
pub struct SupervisionOutcome {
    pub reason: WakeReason,
    pub pid: u32,
    /// Exit status collected after the kill.
    pub status: ExitStatus,
    /// True when the client had already exited before it had to be killed.
    pub exited_early: bool,
}

/// Start `command`, wait on `channel` for at most `timeout`, then kill the
/// client.
///
/// There is no restart: one call supervises exactly one process. The child
/// is always reaped before this returns `Ok`.
pub fn supervise_external_process<C>(
    command: &ClientCommand,
    channel: &mut C,
    timeout: Duration,
) -> Result<SupervisionOutcome, SupervisorError>
where
    C: LivenessChannel + ?Sized,
{
    let mut child = Command::new(&command.program)
        .args(&command.args)
        .current_dir(command.working_dir())
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|error| SupervisorError::Spawn {
            program: command.program.clone(),
            error,
        })?;
    let pid = child.id();
    info!("Started {} (pid {}), timeout {:?}", command.program, pid, timeout);

    let reason = channel.wait(timeout);
    match reason {
        WakeReason::Signalled => info!("Shutdown requested, stopping pid {}", pid),
        WakeReason::Disconnected => warn!("Controller went away, stopping pid {}", pid),
        WakeReason::TimedOut => warn!("Timeout of {:?} elapsed, stopping pid {}", timeout, pid),
    }

    if let Some(status) = child.try_wait()? {
        info!("pid {} had already exited with {}", pid, status);
        return Ok(SupervisionOutcome {
            reason,
            pid,
            status,
            exited_early: true,
        });
    }

    info!("Killing {} (pid {})", command.program, pid);
    if let Err(error) = child.kill() {
        // Lost the race with a natural exit; reaping below still succeeds.
        if error.kind() != std::io::ErrorKind::InvalidInput {
            return Err(SupervisorError::Kill { pid, error });
        }
    }
    let status = child.wait()?;
    info!("pid {} terminated: {}", pid, status);

    Ok(SupervisionOutcome {
        reason,
        pid,
        status,
        exited_early: false,
    })
}
