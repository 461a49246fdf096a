use camino::{Utf8Path, Utf8PathBuf};
use nightmirror_core::{is_within, ComparePolicy, RunStamp};
use nightmirror_scanner::{files_needing_sync, needs_sync, Scanner};
use tracing::{info, warn};

use crate::execute::{move_preserving, perform_sync};
use crate::{mirror_path, PipelineError};

/// Prefix of the per-run folder that receives originals once their copy is done.
pub const ARCHIVE_PREFIX: &str = "SyncStarted_";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MirrorStats {
    pub files_copied: u64,
    pub bytes_copied: u64,
    pub files_archived: u64,
    pub files_left: u64,
    pub archive_dir: Option<Utf8PathBuf>,
}

pub fn archive_dir(archive_root: &Utf8Path, stamp: &RunStamp) -> Utf8PathBuf {
    archive_root.join(format!("{ARCHIVE_PREFIX}{stamp}"))
}

/// Copy `source` into `destination`, then move every original whose mirror
/// is now in sync into `archive_root/SyncStarted_<stamp>/`, keeping its
/// relative path.
///
/// Originals that were already mirrored by an earlier, interrupted run are
/// archived as well. A file that still differs after the copy is left in
/// place and counted in `files_left`.
pub fn mirror_and_archive(
    source: &Utf8Path,
    destination: &Utf8Path,
    archive_root: &Utf8Path,
    stamp: &RunStamp,
    policy: ComparePolicy,
) -> Result<MirrorStats, PipelineError> {
    if !source.is_dir() {
        return Err(PipelineError::SourceMissing(source.to_owned()));
    }
    let archive = archive_dir(archive_root, stamp);
    if is_within(source, &archive) {
        return Err(PipelineError::ArchiveInsideSource {
            archive,
            source_root: source.to_owned(),
        });
    }

    let pairs = files_needing_sync(source, destination, policy)?;
    let synced = perform_sync(&pairs)?;

    let mut stats = MirrorStats {
        files_copied: synced.files_copied,
        bytes_copied: synced.bytes_copied,
        ..MirrorStats::default()
    };

    for entry in Scanner::walk(source)? {
        let mirrored = mirror_path(source, destination, &entry.path)?;
        if needs_sync(&entry.path, &mirrored, policy)? {
            warn!("{} still differs from {}, leaving it in place", entry.path, mirrored);
            stats.files_left += 1;
            continue;
        }

        let target = mirror_path(source, &archive, &entry.path)?;
        move_preserving(&entry.path, &target)?;
        stats.files_archived += 1;
    }

    if stats.files_archived > 0 {
        info!("Archived {} originals into {}", stats.files_archived, archive);
        stats.archive_dir = Some(archive);
    }
    Ok(stats)
}
