use crate::{needs_sync, Scanner, ScannerError};
use camino::Utf8Path;
use nightmirror_core::{ComparePolicy, MirrorPath, SyncPair};
use tracing::{debug, info};

/// Every regular file under `source_root` whose mirror under
/// `destination_root` is missing or out of date. Order follows traversal.
pub fn files_needing_sync(
    source_root: &Utf8Path,
    destination_root: &Utf8Path,
    policy: ComparePolicy,
) -> Result<Vec<SyncPair>, ScannerError> {
    let entries = Scanner::walk(source_root)?;
    let scanned = entries.len();
    let mut pairs = Vec::new();

    for entry in entries {
        let destination = MirrorPath::map(source_root, destination_root, &entry.path)
            .ok_or_else(|| ScannerError::OutsideRoot {
                path: entry.path.clone(),
                root: source_root.to_owned(),
            })?;

        if needs_sync(&entry.path, &destination, policy)? {
            debug!("Out of date: {}", entry.path);
            pairs.push(SyncPair::new(entry.path, destination));
        }
    }

    info!(
        "{} -> {}: {} of {} files need sync ({:?})",
        source_root,
        destination_root,
        pairs.len(),
        scanned,
        policy
    );
    Ok(pairs)
}
