use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

pub mod path_utils;
pub mod snapshot;
pub mod stamp;

pub use path_utils::MirrorPath;
pub use snapshot::Snapshot;
pub use stamp::RunStamp;

/// A located file as seen during traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: Utf8PathBuf,
    pub modified: SystemTime,
    pub size: u64,
    pub is_dir: bool,
}

/// One file that must be copied. The destination's parents may not exist yet.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SyncPair {
    pub source: Utf8PathBuf,
    pub destination: Utf8PathBuf,
}

impl SyncPair {
    pub fn new(source: impl Into<Utf8PathBuf>, destination: impl Into<Utf8PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
        }
    }
}

/// One auxiliary folder to back up with rotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuxFolderSpec {
    pub source_folder: Utf8PathBuf,
    pub destination_root: Utf8PathBuf,
    pub max_backups: usize,
}

impl AuxFolderSpec {
    pub fn new(
        source_folder: impl Into<Utf8PathBuf>,
        destination_root: impl Into<Utf8PathBuf>,
        max_backups: usize,
    ) -> Self {
        Self {
            source_folder: source_folder.into(),
            destination_root: destination_root.into(),
            max_backups,
        }
    }

    /// Short label for log lines.
    pub fn label(&self) -> &str {
        self.source_folder
            .file_name()
            .unwrap_or(self.source_folder.as_str())
    }

    pub fn snapshot_path(&self, stamp: &RunStamp) -> Utf8PathBuf {
        self.destination_root.join(stamp.to_string())
    }
}

/// How two files are compared when deciding whether a copy is needed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparePolicy {
    /// File type, size and modification time only.
    #[default]
    Shallow,
    /// Shallow first; equal sizes with differing mtimes fall back to a byte comparison.
    Content,
}

/// Coarse classification shared by every crate's error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Io,
    Timeout,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Io => "io",
            ErrorKind::Timeout => "timeout",
        };
        f.write_str(s)
    }
}

/// Convert a std path into UTF-8, reporting the lossy form on failure.
pub fn utf8_path(path: std::path::PathBuf) -> Result<Utf8PathBuf, NonUtf8Path> {
    Utf8PathBuf::from_path_buf(path).map_err(|p| NonUtf8Path(p.to_string_lossy().into_owned()))
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("path is not valid UTF-8: {0}")]
pub struct NonUtf8Path(pub String);

/// True if `path` is `root` itself or lies underneath it.
///
/// Both sides are resolved first, so `./ToSync/x`, `ToSync/../ToSync/x` and
/// the absolute spelling of the same folder all compare equal. Symlinks are
/// followed for whatever part of each path already exists.
pub fn is_within(root: &Utf8Path, path: &Utf8Path) -> bool {
    resolve_path(path).starts_with(resolve_path(root))
}

/// Absolute, `.`/`..`-free form of `path`, with the longest existing
/// ancestor canonicalized.
pub fn resolve_path(path: &Utf8Path) -> Utf8PathBuf {
    let lexical = lexical_absolute(path);
    for ancestor in lexical.ancestors() {
        let Ok(real) = ancestor.canonicalize_utf8() else {
            continue;
        };
        return match lexical.strip_prefix(ancestor) {
            Ok(rest) if !rest.as_str().is_empty() => real.join(rest),
            _ => real,
        };
    }
    lexical
}

fn lexical_absolute(path: &Utf8Path) -> Utf8PathBuf {
    let joined = if path.is_absolute() {
        path.to_owned()
    } else {
        match std::env::current_dir().ok().map(utf8_path) {
            Some(Ok(cwd)) => cwd.join(path),
            _ => path.to_owned(),
        }
    };

    let mut out = Utf8PathBuf::new();
    for component in joined.components() {
        match component {
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dot_segments_do_not_hide_nesting() {
        assert!(is_within(
            Utf8Path::new("ToSync"),
            Utf8Path::new("./ToSync/SyncStarted_01012025_000000")
        ));
        assert!(is_within(
            Utf8Path::new("./ToSync"),
            Utf8Path::new("other/../ToSync/archive")
        ));
        assert!(!is_within(
            Utf8Path::new("ToSync"),
            Utf8Path::new("ToSync/../Archive")
        ));
    }

    #[test]
    fn relative_and_absolute_spellings_agree() {
        let cwd = utf8_path(std::env::current_dir().unwrap()).unwrap();
        assert!(is_within(
            Utf8Path::new("ToSync"),
            &cwd.join("ToSync").join("archive")
        ));
        assert!(is_within(&cwd.join("ToSync"), Utf8Path::new("ToSync/archive")));
    }

    #[test]
    fn sibling_with_shared_prefix_is_outside() {
        assert!(!is_within(
            Utf8Path::new("/data/ToSync"),
            Utf8Path::new("/data/ToSync2/archive")
        ));
    }
}
