use crate::logging::init_logging;
use crate::run::{run, RunOptions};
use crate::CliComparePolicy;
use anyhow::Result;
use camino::{Utf8Path, Utf8PathBuf};
use clap::Args;
use nightmirror_config::{Settings, LOG_PREFIX, SUPERVISOR_LOG_PREFIX};
use nightmirror_core::RunStamp;
use nightmirror_infra::{supervise_external_process, ClientCommand, PipeLiveness};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Folder whose files are mirrored to the drive, then archived
    #[arg(long)]
    pub source: Option<Utf8PathBuf>,
    /// Where the sync client mounts the drive
    #[arg(long)]
    pub mount: Option<Utf8PathBuf>,
    /// Folder under the mount that receives the copy
    #[arg(long)]
    pub dest_subdir: Option<Utf8PathBuf>,
    /// Parent folder for SyncStarted_<stamp> archives
    #[arg(long)]
    pub archive_root: Option<Utf8PathBuf>,
    /// Sync client executable, its folder, or its versioned install root
    #[arg(long)]
    pub client: Option<Utf8PathBuf>,
    #[arg(long, allow_hyphen_values = true)]
    pub client_args: Option<String>,
    /// Do not start the sync client; the drive must already be mounted
    #[arg(long)]
    pub skip_client: bool,
    #[arg(long)]
    pub aux_config: Option<Utf8PathBuf>,
    #[arg(long, env = "NIGHTMIRROR_SETTINGS")]
    pub settings: Option<Utf8PathBuf>,
    #[arg(long)]
    pub log_dir: Option<Utf8PathBuf>,
    #[arg(long)]
    pub upload_grace_secs: Option<u64>,
    #[arg(long)]
    pub supervisor_timeout_secs: Option<u64>,
    #[arg(long)]
    pub mount_timeout_secs: Option<u64>,
    #[arg(long, value_enum)]
    pub aux_compare: Option<CliComparePolicy>,
    #[arg(long, value_enum)]
    pub mirror_compare: Option<CliComparePolicy>,
    /// Supervise the client from a thread instead of a helper process
    #[arg(long)]
    pub in_process_supervisor: bool,
    /// Exit with status 1 when the run fails
    #[arg(long)]
    pub fail_on_error: bool,
    #[arg(short, long)]
    pub debug: bool,
}

impl RunArgs {
    /// Layer the flags that were given over `settings`.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(v) = &self.source {
            settings.source_dir = v.clone();
        }
        if let Some(v) = &self.mount {
            settings.mount_path = v.clone();
        }
        if let Some(v) = &self.dest_subdir {
            settings.dest_subdir = v.clone();
        }
        if let Some(v) = &self.archive_root {
            settings.archive_root = v.clone();
        }
        if let Some(v) = &self.client {
            settings.client_path = Some(v.clone());
        }
        if let Some(v) = &self.client_args {
            settings.client_args = v.clone();
        }
        if let Some(v) = &self.aux_config {
            settings.aux_config = v.clone();
        }
        if let Some(v) = &self.log_dir {
            settings.log_dir = v.clone();
        }
        if let Some(v) = self.upload_grace_secs {
            settings.upload_grace_secs = v;
        }
        if let Some(v) = self.supervisor_timeout_secs {
            settings.supervisor_timeout_secs = v;
        }
        if let Some(v) = self.mount_timeout_secs {
            settings.mount_ceiling_secs = v;
        }
        if let Some(v) = self.aux_compare {
            settings.aux_compare = v.into();
        }
        if let Some(v) = self.mirror_compare {
            settings.mirror_compare = v.into();
        }
        settings.in_process_supervisor |= self.in_process_supervisor;
        settings.fail_on_error |= self.fail_on_error;
    }
}

#[derive(Args, Debug, Clone)]
pub struct SuperviseArgs {
    #[arg(long)]
    pub client: Utf8PathBuf,
    /// One argument for the client; repeat for more
    #[arg(long = "client-arg", allow_hyphen_values = true)]
    pub client_args: Vec<String>,
    #[arg(long)]
    pub timeout_secs: u64,
    #[arg(long, default_value = ".")]
    pub log_dir: Utf8PathBuf,
    #[arg(long)]
    pub debug: bool,
}

/// Every failure is logged with its full cause chain. The exit status is 0
/// unless `fail_on_error` is set, so a scheduler never sees a failed task.
pub fn cmd_run(args: RunArgs) -> ExitCode {
    let stamp = RunStamp::now();
    let loaded = Settings::load(args.settings.as_deref());

    let log_dir = args
        .log_dir
        .clone()
        .or_else(|| loaded.as_ref().ok().map(|s| s.log_dir.clone()))
        .unwrap_or_else(|| Utf8PathBuf::from("."));
    let log = init_logging(&log_dir, LOG_PREFIX, &stamp, args.debug, true);
    if let Some(session) = &log {
        info!("Logging to {}", session.log_path);
    }

    let mut fail_on_error = args.fail_on_error;
    let result = loaded.map_err(anyhow::Error::from).and_then(|mut settings| {
        args.apply(&mut settings);
        fail_on_error = settings.fail_on_error;
        let opts = RunOptions {
            stamp,
            skip_client: args.skip_client,
            debug: args.debug,
            ..RunOptions::new(settings)
        };
        run(&opts)
    });

    match result {
        Ok(summary) => {
            summary.log();
            info!("Run {} finished", stamp);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Run {} failed: {:#}", stamp, e);
            if fail_on_error {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
    }
}

/// Helper process mode: stdin is the liveness pipe from the main process.
pub fn cmd_supervise(args: SuperviseArgs) -> ExitCode {
    let stamp = RunStamp::now();
    let _log = init_logging(&args.log_dir, SUPERVISOR_LOG_PREFIX, &stamp, args.debug, false);

    match supervise(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Supervisor failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// A command line clap rejected. Help and version requests print as usual;
/// anything else goes to stderr and into a run log, and exits like a failed
/// run would.
pub fn cmd_usage_error(err: clap::Error, raw_args: &[String]) -> ExitCode {
    let _ = err.print();
    if !err.use_stderr() {
        return ExitCode::SUCCESS;
    }

    let settings_path = raw_flag(raw_args, "--settings")
        .map(Utf8PathBuf::from)
        .or_else(|| std::env::var("NIGHTMIRROR_SETTINGS").ok().map(Utf8PathBuf::from));
    let settings = Settings::load(settings_path.as_deref()).ok();
    let log_dir = raw_flag(raw_args, "--log-dir")
        .map(Utf8PathBuf::from)
        .or_else(|| settings.as_ref().map(|s| s.log_dir.clone()))
        .unwrap_or_else(|| Utf8PathBuf::from("."));
    let fail_on_error = raw_args.iter().any(|a| a == "--fail-on-error")
        || settings.is_some_and(|s| s.fail_on_error);

    log_usage_error(&err, &log_dir);
    if fail_on_error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Record a rejected command line in a fresh run log under `log_dir`.
pub fn log_usage_error(err: &clap::Error, log_dir: &Utf8Path) {
    let stamp = RunStamp::now();
    let _log = init_logging(log_dir, LOG_PREFIX, &stamp, false, false);
    warn!("Run {} not started", stamp);
    error!("Invalid command line: {}", err.to_string().trim_end());
}

/// Value of `--name VALUE` or `--name=VALUE` in arguments clap could not parse.
fn raw_flag<'a>(raw_args: &'a [String], name: &str) -> Option<&'a str> {
    let mut iter = raw_args.iter();
    while let Some(arg) = iter.next() {
        if arg == name {
            return iter.next().map(String::as_str);
        }
        if let Some(value) = arg.strip_prefix(name).and_then(|r| r.strip_prefix('=')) {
            return Some(value);
        }
    }
    None
}

fn supervise(args: &SuperviseArgs) -> Result<()> {
    let command = ClientCommand {
        program: args.client.clone(),
        args: args.client_args.clone(),
    };
    let mut liveness = PipeLiveness::spawn(std::io::stdin());
    let outcome = supervise_external_process(
        &command,
        &mut liveness,
        Duration::from_secs(args.timeout_secs),
    )?;
    info!(
        "Client pid {} stopped ({}), {}",
        outcome.pid, outcome.reason, outcome.status
    );
    Ok(())
}
