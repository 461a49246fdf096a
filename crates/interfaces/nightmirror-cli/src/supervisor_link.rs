//! The main process' side of the client supervisor.
//!
//! By default the supervisor is a separate `nightmirror supervise` process
//! whose stdin is a pipe from us. Writing a byte asks it to stop the client;
//! the pipe closing (including when this process dies) does the same.

use anyhow::{Context, Result};
use camino::Utf8Path;
use nightmirror_infra::{
    liveness_pair, supervise_external_process, ClientCommand, LivenessSender, SupervisionOutcome,
    SupervisorError,
};
use std::fmt;
use std::io::Write;
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{info, warn};

/// How the supervisor finished, as seen from the main process.
#[derive(Debug)]
pub enum SupervisorReport {
    InProcess(SupervisionOutcome),
    Helper(ExitStatus),
}

impl fmt::Display for SupervisorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SupervisorReport::InProcess(o) => {
                write!(f, "client pid {} stopped ({}), {}", o.pid, o.reason, o.status)
            }
            SupervisorReport::Helper(status) => write!(f, "supervisor helper exited, {status}"),
        }
    }
}

/// A running supervisor. Dropping it without [`SupervisorLink::shutdown`]
/// still closes the channel and waits for the client to be killed.
pub enum SupervisorLink {
    InProcess(InProcessSupervisor),
    Helper(HelperProcess),
}

impl SupervisorLink {
    pub fn start(
        command: &ClientCommand,
        timeout: Duration,
        in_process: bool,
        log_dir: &Utf8Path,
        debug: bool,
    ) -> Result<Self> {
        if in_process {
            Ok(Self::InProcess(InProcessSupervisor::start(command.clone(), timeout)))
        } else {
            HelperProcess::spawn(command, timeout, log_dir, debug).map(Self::Helper)
        }
    }

    pub fn shutdown(self) -> Result<SupervisorReport> {
        match self {
            SupervisorLink::InProcess(s) => s.shutdown().map(SupervisorReport::InProcess),
            SupervisorLink::Helper(h) => h.shutdown().map(SupervisorReport::Helper),
        }
    }
}

type SupervisorThread = JoinHandle<Result<SupervisionOutcome, SupervisorError>>;

pub struct InProcessSupervisor {
    sender: Option<LivenessSender>,
    thread: Option<SupervisorThread>,
}

impl InProcessSupervisor {
    fn start(command: ClientCommand, timeout: Duration) -> Self {
        let (sender, mut rx) = liveness_pair();
        let thread = thread::spawn(move || supervise_external_process(&command, &mut rx, timeout));
        Self {
            sender: Some(sender),
            thread: Some(thread),
        }
    }

    fn shutdown(mut self) -> Result<SupervisionOutcome> {
        if let Some(sender) = self.sender.take() {
            sender.shutdown();
        }
        let thread = self
            .thread
            .take()
            .context("Supervisor thread already joined")?;
        let outcome = thread
            .join()
            .map_err(|_| anyhow::anyhow!("Supervisor thread panicked"))??;
        Ok(outcome)
    }
}

impl Drop for InProcessSupervisor {
    fn drop(&mut self) {
        self.sender.take();
        if let Some(thread) = self.thread.take() {
            match thread.join() {
                Ok(Ok(outcome)) => info!("Client pid {} stopped ({})", outcome.pid, outcome.reason),
                Ok(Err(e)) => warn!("Supervisor failed: {}", e),
                Err(_) => warn!("Supervisor thread panicked"),
            }
        }
    }
}

pub struct HelperProcess {
    child: Child,
    stdin: Option<ChildStdin>,
}

impl HelperProcess {
    fn spawn(
        command: &ClientCommand,
        timeout: Duration,
        log_dir: &Utf8Path,
        debug: bool,
    ) -> Result<Self> {
        let exe = std::env::current_exe().context("Failed to locate own executable")?;

        let mut cmd = Command::new(&exe);
        cmd.arg("supervise")
            .arg("--client")
            .arg(command.program.as_str())
            .arg("--timeout-secs")
            .arg(timeout.as_secs().max(1).to_string())
            .arg("--log-dir")
            .arg(log_dir.as_str());
        for arg in &command.args {
            // `=` keeps clap from reading a leading dash as a flag.
            cmd.arg(format!("--client-arg={arg}"));
        }
        if debug {
            cmd.arg("--debug");
        }
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            // Survive the scheduler closing our console window.
            const DETACHED_PROCESS: u32 = 0x0000_0008;
            const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
            cmd.creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP);
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("Failed to start supervisor helper {}", exe.display()))?;
        let stdin = child.stdin.take();
        info!("Started supervisor helper (pid {})", child.id());
        Ok(Self { child, stdin })
    }

    fn shutdown(mut self) -> Result<ExitStatus> {
        if let Some(mut stdin) = self.stdin.take() {
            // The helper may already be gone; closing the pipe below covers that.
            if let Err(e) = stdin.write_all(b"q").and_then(|()| stdin.flush()) {
                warn!("Could not signal supervisor helper: {}", e);
            }
        }
        let status = self
            .child
            .wait()
            .context("Failed to wait for supervisor helper")?;
        Ok(status)
    }
}

impl Drop for HelperProcess {
    fn drop(&mut self) {
        if self.stdin.take().is_some() {
            if let Err(e) = self.child.wait() {
                warn!("Failed to reap supervisor helper: {}", e);
            }
        }
    }
}
