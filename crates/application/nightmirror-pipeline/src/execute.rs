use std::fs;

use camino::Utf8Path;
use filetime::FileTime;
use nightmirror_core::SyncPair;
use tracing::{debug, info, warn};

use crate::io_utils::{is_cross_device, robust_rename, staging_path};
use crate::PipelineError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub files_copied: u64,
    pub bytes_copied: u64,
}

/// Copy every pair in order. The first failure aborts the batch; files
/// already copied stay where they are.
pub fn perform_sync(pairs: &[SyncPair]) -> Result<SyncStats, PipelineError> {
    let mut stats = SyncStats::default();
    for pair in pairs {
        let bytes = copy_preserving(&pair.source, &pair.destination)?;
        info!("{} -> {}", pair.source, pair.destination);
        stats.files_copied += 1;
        stats.bytes_copied += bytes;
    }
    Ok(stats)
}

/// Copy `from` to `to` carrying over its modification and access times.
///
/// Content goes to a hidden staging file first, gets stamped, and is then
/// renamed into place, so `to` is never visible half-written with final
/// metadata. Missing parent directories are created.
pub fn copy_preserving(from: &Utf8Path, to: &Utf8Path) -> Result<u64, PipelineError> {
    ensure_parent(to)?;

    let copy_err = |error| PipelineError::Copy {
        from: from.to_owned(),
        to: to.to_owned(),
        error,
    };

    let meta = fs::metadata(from).map_err(copy_err)?;
    let staging = staging_path(to);

    let result = (|| -> std::io::Result<u64> {
        let bytes = fs::copy(from, &staging)?;
        filetime::set_file_times(
            &staging,
            FileTime::from_last_access_time(&meta),
            FileTime::from_last_modification_time(&meta),
        )?;
        robust_rename(staging.as_std_path(), to.as_std_path())?;
        Ok(bytes)
    })();

    if result.is_err() && staging.exists() {
        if let Err(e) = fs::remove_file(&staging) {
            warn!("Failed to clean up {}: {}", staging, e);
        }
    }
    result.map_err(copy_err)
}

/// Move a file, falling back to copy-then-delete when a rename cannot cross
/// filesystems. Metadata survives either way.
pub fn move_preserving(from: &Utf8Path, to: &Utf8Path) -> Result<(), PipelineError> {
    ensure_parent(to)?;

    match robust_rename(from.as_std_path(), to.as_std_path()) {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device(&e) => {
            debug!("{} and {} are on different devices, copying", from, to);
            copy_preserving(from, to)?;
            fs::remove_file(from).map_err(|error| PipelineError::Remove {
                path: from.to_owned(),
                error,
            })
        }
        Err(error) => Err(PipelineError::Move {
            from: from.to_owned(),
            to: to.to_owned(),
            error,
        }),
    }
}

fn ensure_parent(path: &Utf8Path) -> Result<(), PipelineError> {
    match path.parent() {
        Some(parent) if !parent.as_str().is_empty() && !parent.is_dir() => {
            fs::create_dir_all(parent).map_err(|error| PipelineError::CreateDir {
                path: parent.to_owned(),
                error,
            })
        }
        _ => Ok(()),
    }
}
