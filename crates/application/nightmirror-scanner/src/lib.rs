use camino::{Utf8Path, Utf8PathBuf};
use filetime::FileTime;
use nightmirror_core::{utf8_path, ErrorKind, FileEntry, NonUtf8Path};
use std::fs;
use std::io;
use tracing::{debug, warn};
use walkdir::WalkDir;

pub mod compare;
pub mod diff;

pub use compare::{needs_sync, same_contents, Signature};
pub use diff::files_needing_sync;

#[derive(Debug, thiserror::Error)]
pub enum ScannerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error(transparent)]
    NonUtf8(#[from] NonUtf8Path),
    #[error("{path} is not inside {root}")]
    OutsideRoot { path: Utf8PathBuf, root: Utf8PathBuf },
}

impl ScannerError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Io
    }
}

pub struct Scanner;

impl Scanner {
    /// Modification time at the precision the filesystem reports.
    pub fn mtime(meta: &fs::Metadata) -> FileTime {
        FileTime::from_last_modification_time(meta)
    }

    fn entry(path: &Utf8Path, meta: &fs::Metadata) -> Result<FileEntry, ScannerError> {
        Ok(FileEntry {
            path: path.to_owned(),
            modified: meta.modified()?,
            size: meta.len(),
            is_dir: meta.is_dir(),
        })
    }

    /// Every regular file under `root`, recursively. Directories are left out.
    /// A symlink to a file counts as that file; links to directories are not
    /// followed and dangling links are skipped.
    pub fn walk(root: &Utf8Path) -> Result<Vec<FileEntry>, ScannerError> {
        let mut files = Vec::new();
        for walk in WalkDir::new(root) {
            let walk = walk?;
            if walk.file_type().is_dir() {
                continue;
            }
            let path = utf8_path(walk.into_path())?;
            let meta = match fs::metadata(&path) {
                Ok(meta) => meta,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    warn!("Skipping dangling link {}", path);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            if !meta.is_file() {
                continue;
            }
            files.push(Self::entry(&path, &meta)?);
        }
        debug!("Walked {}: {} files", root, files.len());
        Ok(files)
    }
}
