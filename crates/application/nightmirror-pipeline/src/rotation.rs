//! Dated, size-capped backups of small auxiliary folders.
//!
//! Each [`AuxFolderSpec`] owns a destination root holding snapshot
//! directories named after the run stamp. A new snapshot is only taken when
//! the source differs from the newest one, and the oldest snapshots are
//! removed until at most `max_backups` remain.

use std::collections::HashSet;
use std::fs;

use camino::Utf8Path;
use nightmirror_core::{
    is_within, resolve_path, utf8_path, AuxFolderSpec, ComparePolicy, RunStamp, Snapshot, SyncPair,
};
use nightmirror_scanner::{files_needing_sync, Scanner, ScannerError};
use rayon::prelude::*;
use tracing::{error, info, warn};
use walkdir::WalkDir;

use crate::execute::perform_sync;
use crate::{mirror_path, PipelineError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotAction {
    /// Source changed (or nothing existed yet); a new snapshot was written.
    Created(Snapshot),
    /// Source matches the newest snapshot; nothing written.
    Unchanged(Snapshot),
    /// A snapshot with this stamp already exists; nothing written.
    AlreadyTaken(Snapshot),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationReport {
    pub action: SnapshotAction,
    pub evicted: Vec<Snapshot>,
}

impl RotationReport {
    pub fn created(&self) -> Option<&Snapshot> {
        match &self.action {
            SnapshotAction::Created(s) => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct RotationResult {
    pub spec: AuxFolderSpec,
    pub outcome: Result<RotationReport, PipelineError>,
}

/// Take a snapshot of `spec.source_folder` if it changed, then enforce retention.
pub fn maybe_snapshot(
    spec: &AuxFolderSpec,
    stamp: &RunStamp,
    policy: ComparePolicy,
) -> Result<RotationReport, PipelineError> {
    if spec.max_backups == 0 {
        return Err(PipelineError::InvalidRetention(spec.source_folder.clone()));
    }
    if !spec.source_folder.is_dir() {
        return Err(PipelineError::SourceMissing(spec.source_folder.clone()));
    }
    // A backup root under the source would be copied into its own snapshots.
    if is_within(&spec.source_folder, &spec.destination_root) {
        return Err(PipelineError::BackupInsideSource {
            destination_root: spec.destination_root.clone(),
            source_root: spec.source_folder.clone(),
        });
    }
    fs::create_dir_all(&spec.destination_root).map_err(|error| PipelineError::CreateDir {
        path: spec.destination_root.clone(),
        error,
    })?;

    let existing = list_snapshots(&spec.destination_root)?;
    let unchanged = match existing.last() {
        Some(latest) => files_needing_sync(&spec.source_folder, &latest.path, policy)?
            .is_empty()
            .then(|| latest.clone()),
        None => None,
    };

    let action = if let Some(latest) = unchanged {
        info!(
            "{}: unchanged since {}, skipping snapshot",
            spec.label(),
            latest.stamp
        );
        SnapshotAction::Unchanged(latest)
    } else {
        let target = spec.snapshot_path(stamp);
        if target.exists() {
            warn!("{}: {} already exists, not overwriting", spec.label(), target);
            SnapshotAction::AlreadyTaken(Snapshot {
                stamp: *stamp,
                path: target,
            })
        } else {
            let snapshot = take_snapshot(&spec.source_folder, &target, *stamp)?;
            info!("{}: created snapshot {}", spec.label(), snapshot.path);
            SnapshotAction::Created(snapshot)
        }
    };

    let evicted = enforce_retention(&spec.destination_root, spec.max_backups)?;
    Ok(RotationReport { action, evicted })
}

/// Run [`maybe_snapshot`] for every spec. Specs share nothing, so they run in
/// parallel and one failure does not stop the others.
///
/// Only the first spec naming a given backup root is rotated; later ones fail
/// with [`PipelineError::DuplicateBackupRoot`].
pub fn rotate_all(
    specs: &[AuxFolderSpec],
    stamp: &RunStamp,
    policy: ComparePolicy,
) -> Vec<RotationResult> {
    let mut claimed = HashSet::new();
    let owners: Vec<bool> = specs
        .iter()
        .map(|spec| claimed.insert(resolve_path(&spec.destination_root)))
        .collect();

    specs
        .par_iter()
        .zip(owners)
        .map(|(spec, owner)| {
            let outcome = if owner {
                maybe_snapshot(spec, stamp, policy)
            } else {
                Err(PipelineError::DuplicateBackupRoot(spec.destination_root.clone()))
            };
            if let Err(e) = &outcome {
                error!("{}: rotation failed: {}", spec.label(), e);
            }
            RotationResult {
                spec: spec.clone(),
                outcome,
            }
        })
        .collect()
}

/// Snapshots directly under `root`, oldest first. Other entries are ignored.
pub fn list_snapshots(root: &Utf8Path) -> Result<Vec<Snapshot>, PipelineError> {
    let mut snapshots = Vec::new();
    if !root.is_dir() {
        return Ok(snapshots);
    }
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let path = utf8_path(entry.path())?;
        if let Some(snapshot) = Snapshot::parse(&path) {
            snapshots.push(snapshot);
        }
    }
    Snapshot::sort(&mut snapshots);
    Ok(snapshots)
}

/// Delete the oldest snapshots until at most `max_backups` remain.
pub fn enforce_retention(
    root: &Utf8Path,
    max_backups: usize,
) -> Result<Vec<Snapshot>, PipelineError> {
    let mut snapshots = list_snapshots(root)?;
    let mut evicted = Vec::new();
    while snapshots.len() > max_backups {
        let oldest = snapshots.remove(0);
        fs::remove_dir_all(&oldest.path).map_err(|error| PipelineError::Remove {
            path: oldest.path.clone(),
            error,
        })?;
        info!("Evicted snapshot {}", oldest.path);
        evicted.push(oldest);
    }
    Ok(evicted)
}

/// Copy the whole of `source` into `target`. Work happens in a hidden
/// `.stamp.partial` sibling that is renamed into place on success, so an
/// interrupted copy never shows up as a snapshot.
fn take_snapshot(
    source: &Utf8Path,
    target: &Utf8Path,
    stamp: RunStamp,
) -> Result<Snapshot, PipelineError> {
    let staging = target.with_file_name(format!(".{stamp}.partial"));
    if staging.exists() {
        remove_tree(&staging)?;
    }

    let result = copy_tree(source, &staging).and_then(|()| {
        fs::rename(&staging, target).map_err(|error| PipelineError::Move {
            from: staging.clone(),
            to: target.to_owned(),
            error,
        })
    });

    if let Err(e) = result {
        if staging.exists() {
            if let Err(cleanup) = fs::remove_dir_all(&staging) {
                warn!("Failed to clean up {}: {}", staging, cleanup);
            }
        }
        return Err(e);
    }

    Ok(Snapshot {
        stamp,
        path: target.to_owned(),
    })
}

fn copy_tree(source: &Utf8Path, target: &Utf8Path) -> Result<(), PipelineError> {
    for walk in WalkDir::new(source) {
        let walk = walk.map_err(ScannerError::from)?;
        if !walk.file_type().is_dir() {
            continue;
        }
        let dir = utf8_path(walk.into_path())?;
        let mirrored = mirror_path(source, target, &dir)?;
        fs::create_dir_all(&mirrored).map_err(|error| PipelineError::CreateDir {
            path: mirrored.clone(),
            error,
        })?;
    }

    let pairs = Scanner::walk(source)?
        .into_iter()
        .map(|entry| {
            let destination = mirror_path(source, target, &entry.path)?;
            Ok(SyncPair::new(entry.path, destination))
        })
        .collect::<Result<Vec<_>, PipelineError>>()?;
    perform_sync(&pairs)?;
    Ok(())
}

fn remove_tree(path: &Utf8Path) -> Result<(), PipelineError> {
    fs::remove_dir_all(path).map_err(|error| PipelineError::Remove {
        path: path.to_owned(),
        error,
    })
}
