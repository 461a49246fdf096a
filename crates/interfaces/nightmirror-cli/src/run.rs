//! One nightly run, end to end.

use anyhow::{bail, Context, Result};
use humansize::{format_size, DECIMAL};
use nightmirror_config::{
    clamp_timeout_secs, AuxConfig, Settings, CLIENT_EXE_NAME, MOUNT_POLL_INTERVAL,
};
use nightmirror_core::RunStamp;
use nightmirror_infra::{resolve_client_executable, ClientCommand};
use nightmirror_pipeline::{mirror_and_archive, rotate_all, wait_for_mount};
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

use crate::supervisor_link::{SupervisorLink, SupervisorReport};

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub settings: Settings,
    pub stamp: RunStamp,
    /// Assume the drive is already mounted and do not start the client.
    pub skip_client: bool,
    pub mount_poll: Duration,
    /// Forwarded to the supervisor helper.
    pub debug: bool,
}

impl RunOptions {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            stamp: RunStamp::now(),
            skip_client: false,
            mount_poll: MOUNT_POLL_INTERVAL,
            debug: false,
        }
    }
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub files_copied: u64,
    pub bytes_copied: u64,
    pub files_archived: u64,
    pub files_left: u64,
    pub snapshots_created: usize,
    pub snapshots_evicted: usize,
    pub aux_failed: usize,
    pub supervisor: Option<SupervisorReport>,
}

impl RunSummary {
    pub fn log(&self) {
        info!(
            "Copied {} files ({}), archived {}, left {}",
            self.files_copied,
            format_size(self.bytes_copied, DECIMAL),
            self.files_archived,
            self.files_left
        );
        info!(
            "Snapshots: {} created, {} evicted, {} folders failed",
            self.snapshots_created, self.snapshots_evicted, self.aux_failed
        );
        if let Some(report) = &self.supervisor {
            info!("Supervisor: {}", report);
        }
    }
}

/// Start the client, rotate auxiliary folders, wait for the drive, mirror
/// and archive, give uploads a head start, then stop the client.
///
/// An error part way through still stops the client: the supervisor link
/// shuts it down when dropped.
pub fn run(opts: &RunOptions) -> Result<RunSummary> {
    let settings = &opts.settings;
    let mut summary = RunSummary::default();
    info!("Run {} starting", opts.stamp);

    let link = if opts.skip_client {
        info!("Not starting the sync client");
        None
    } else {
        let command = client_command(settings)?;
        let timeout = Duration::from_secs(clamp_timeout_secs(settings.supervisor_timeout_secs));
        Some(SupervisorLink::start(
            &command,
            timeout,
            settings.in_process_supervisor,
            &settings.log_dir,
            opts.debug,
        )?)
    };

    let aux = AuxConfig::load_if_present(&settings.aux_config)?;
    for result in rotate_all(&aux.specs, &opts.stamp, settings.aux_compare) {
        match result.outcome {
            Ok(report) => {
                summary.snapshots_created += usize::from(report.created().is_some());
                summary.snapshots_evicted += report.evicted.len();
            }
            // Already logged by the rotation itself.
            Err(_) => summary.aux_failed += 1,
        }
    }

    wait_for_mount(
        &settings.mount_path,
        opts.mount_poll,
        Duration::from_secs(settings.mount_ceiling_secs),
    )
    .context("Destination drive never appeared")?;

    let destination = settings.destination();
    info!("Mirroring {} -> {}", settings.source_dir, destination);
    let stats = mirror_and_archive(
        &settings.source_dir,
        &destination,
        &settings.archive_root,
        &opts.stamp,
        settings.mirror_compare,
    )
    .with_context(|| format!("Failed to mirror {}", settings.source_dir))?;
    summary.files_copied = stats.files_copied;
    summary.bytes_copied = stats.bytes_copied;
    summary.files_archived = stats.files_archived;
    summary.files_left = stats.files_left;

    if let Some(link) = link {
        if settings.upload_grace_secs > 0 {
            info!(
                "Leaving the client running for {}s so uploads can start",
                settings.upload_grace_secs
            );
            thread::sleep(Duration::from_secs(settings.upload_grace_secs));
        }
        match link.shutdown() {
            Ok(report) => summary.supervisor = Some(report),
            Err(e) => warn!("Supervisor shutdown failed: {:#}", e),
        }
    }

    Ok(summary)
}

fn client_command(settings: &Settings) -> Result<ClientCommand> {
    let Some(path) = &settings.client_path else {
        bail!("No sync client configured; pass --client or --skip-client");
    };
    let exe = resolve_client_executable(path, CLIENT_EXE_NAME)?;
    info!("Using sync client {}", exe);
    Ok(ClientCommand::new(exe).with_arg_string(&settings.client_args)?)
}
