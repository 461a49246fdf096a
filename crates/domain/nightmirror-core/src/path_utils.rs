use camino::{Utf8Path, Utf8PathBuf};

pub struct MirrorPath;

impl MirrorPath {
    /// Map `path` under `source_root` onto the same relative location under
    /// `destination_root`. Works on path components, so a root name that
    /// recurs deeper in the path is left alone.
    ///
    /// Returns `None` when `path` is not inside `source_root`, including
    /// paths that climb back out through `..`.
    pub fn map(
        source_root: &Utf8Path,
        destination_root: &Utf8Path,
        path: &Utf8Path,
    ) -> Option<Utf8PathBuf> {
        let rel = path.strip_prefix(source_root).ok()?;
        if !Self::verify_safe(rel) {
            return None;
        }
        if rel.as_str().is_empty() {
            return Some(destination_root.to_owned());
        }
        Some(destination_root.join(rel))
    }

    /// Reject relative paths that would climb out of their root.
    pub fn verify_safe(rel_path: &Utf8Path) -> bool {
        !rel_path.is_absolute()
            && !rel_path
                .components()
                .any(|c| matches!(c, camino::Utf8Component::ParentDir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_nested_file_onto_destination_root() {
        let mapped = MirrorPath::map(
            Utf8Path::new("/data/a"),
            Utf8Path::new("/mnt/dst"),
            Utf8Path::new("/data/a/b/2.txt"),
        );
        assert_eq!(mapped, Some(Utf8PathBuf::from("/mnt/dst/b/2.txt")));
    }

    #[test]
    fn recurring_root_name_is_only_replaced_at_the_prefix() {
        let mapped = MirrorPath::map(
            Utf8Path::new("/x/a"),
            Utf8Path::new("/y"),
            Utf8Path::new("/x/a/x/a/file.txt"),
        );
        assert_eq!(mapped, Some(Utf8PathBuf::from("/y/x/a/file.txt")));
    }

    #[test]
    fn sibling_with_shared_prefix_is_not_inside_root() {
        let mapped = MirrorPath::map(
            Utf8Path::new("/data/a"),
            Utf8Path::new("/mnt/dst"),
            Utf8Path::new("/data/ab/file.txt"),
        );
        assert_eq!(mapped, None);
    }

    #[test]
    fn escaping_path_does_not_map() {
        let mapped = MirrorPath::map(
            Utf8Path::new("/data/a"),
            Utf8Path::new("/mnt/dst"),
            Utf8Path::new("/data/a/../secret.txt"),
        );
        assert_eq!(mapped, None);
    }

    #[test]
    fn parent_components_are_unsafe() {
        assert!(MirrorPath::verify_safe(Utf8Path::new("a/b.txt")));
        assert!(!MirrorPath::verify_safe(Utf8Path::new("../b.txt")));
        assert!(!MirrorPath::verify_safe(Utf8Path::new("/etc/passwd")));
    }
}
