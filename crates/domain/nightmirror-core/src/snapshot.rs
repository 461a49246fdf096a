use crate::RunStamp;
use camino::{Utf8Path, Utf8PathBuf};

/// A dated copy of an auxiliary folder living directly under its destination root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub stamp: RunStamp,
    pub path: Utf8PathBuf,
}

impl Snapshot {
    /// Recognise `dir` as a snapshot if its final component is a bare stamp.
    /// Anything else under a destination root is not ours to rotate.
    pub fn parse(dir: &Utf8Path) -> Option<Self> {
        let name = dir.file_name()?;
        RunStamp::parse(name).map(|stamp| Self {
            stamp,
            path: dir.to_owned(),
        })
    }

    /// Oldest first; ties cannot occur because names are unique within a root.
    pub fn sort(snapshots: &mut [Snapshot]) {
        snapshots.sort_by(|a, b| a.stamp.cmp(&b.stamp));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stamp_directory() {
        let snap = Snapshot::parse(Utf8Path::new("/backups/splits/01022024_030405")).unwrap();
        assert_eq!(snap.stamp.to_string(), "01022024_030405");
    }

    #[test]
    fn ignores_partial_and_foreign_directories() {
        assert!(Snapshot::parse(Utf8Path::new("/b/.01022024_030405.partial")).is_none());
        assert!(Snapshot::parse(Utf8Path::new("/b/notes")).is_none());
    }
}
