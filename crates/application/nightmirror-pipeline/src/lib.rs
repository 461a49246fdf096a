use camino::{Utf8Path, Utf8PathBuf};
use nightmirror_core::{ErrorKind, MirrorPath, NonUtf8Path};
use nightmirror_scanner::ScannerError;
use std::time::Duration;

pub mod archive;
pub mod execute;
mod io_utils;
pub mod mount;
pub mod rotation;

pub use archive::{mirror_and_archive, MirrorStats};
pub use execute::{copy_preserving, perform_sync, SyncStats};
pub use mount::wait_for_mount;
pub use rotation::{
    enforce_retention, list_snapshots, maybe_snapshot, rotate_all, RotationReport, RotationResult,
    SnapshotAction,
};

/// Errors raised while copying, moving, rotating or waiting.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("copy {from} -> {to} failed: {error}")]
    Copy {
        from: Utf8PathBuf,
        to: Utf8PathBuf,
        error: std::io::Error,
    },
    #[error("create directory {path} failed: {error}")]
    CreateDir {
        path: Utf8PathBuf,
        error: std::io::Error,
    },
    #[error("remove {path} failed: {error}")]
    Remove {
        path: Utf8PathBuf,
        error: std::io::Error,
    },
    #[error("move {from} -> {to} failed: {error}")]
    Move {
        from: Utf8PathBuf,
        to: Utf8PathBuf,
        error: std::io::Error,
    },
    #[error("source folder {0} does not exist")]
    SourceMissing(Utf8PathBuf),
    #[error("archive folder {archive} must not be inside source {source_root}")]
    ArchiveInsideSource {
        archive: Utf8PathBuf,
        source_root: Utf8PathBuf,
    },
    #[error("backup folder {destination_root} must not be inside {source_root}")]
    BackupInsideSource {
        destination_root: Utf8PathBuf,
        source_root: Utf8PathBuf,
    },
    #[error("backup folder {0} is already used by another auxiliary folder")]
    DuplicateBackupRoot(Utf8PathBuf),
    #[error("max backups for {0} must be at least 1")]
    InvalidRetention(Utf8PathBuf),
    #[error("timed out after {waited:?} waiting for {path}")]
    MountTimeout { path: Utf8PathBuf, waited: Duration },
    #[error("Scan error: {0}")]
    Scan(#[from] ScannerError),
    #[error(transparent)]
    NonUtf8(#[from] NonUtf8Path),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::MountTimeout { .. } => ErrorKind::Timeout,
            PipelineError::ArchiveInsideSource { .. }
            | PipelineError::BackupInsideSource { .. }
            | PipelineError::DuplicateBackupRoot(_)
            | PipelineError::InvalidRetention(_) => ErrorKind::Configuration,
            PipelineError::Scan(e) => e.kind(),
            PipelineError::Copy { .. }
            | PipelineError::CreateDir { .. }
            | PipelineError::Remove { .. }
            | PipelineError::Move { .. }
            | PipelineError::SourceMissing(_)
            | PipelineError::NonUtf8(_)
            | PipelineError::Io(_) => ErrorKind::Io,
        }
    }
}

/// Mirror `path` from `root` onto `to`, treating a path outside `root` as a scan error.
pub(crate) fn mirror_path(
    root: &Utf8Path,
    to: &Utf8Path,
    path: &Utf8Path,
) -> Result<Utf8PathBuf, PipelineError> {
    MirrorPath::map(root, to, path).ok_or_else(|| {
        PipelineError::Scan(ScannerError::OutsideRoot {
            path: path.to_owned(),
            root: root.to_owned(),
        })
    })
}
