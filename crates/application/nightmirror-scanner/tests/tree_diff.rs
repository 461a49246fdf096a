use camino::Utf8PathBuf;
use filetime::FileTime;
use nightmirror_core::ComparePolicy;
use nightmirror_scanner::{files_needing_sync, Scanner};
use std::fs;
use tempfile::tempdir;

fn setup() -> (tempfile::TempDir, Utf8PathBuf, Utf8PathBuf) {
    let dir = tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    let src = root.join("a");
    let dst = root.join("dst");
    fs::create_dir_all(src.join("b")).unwrap();
    fs::create_dir_all(&dst).unwrap();
    fs::write(src.join("1.txt"), b"one").unwrap();
    fs::write(src.join("b").join("2.txt"), b"two").unwrap();
    (dir, src, dst)
}

#[test]
fn empty_destination_yields_every_file() {
    let (_dir, src, dst) = setup();

    let mut pairs = files_needing_sync(&src, &dst, ComparePolicy::Shallow).unwrap();
    pairs.sort_by(|a, b| a.destination.cmp(&b.destination));

    let destinations: Vec<_> = pairs.iter().map(|p| p.destination.clone()).collect();
    assert_eq!(destinations, vec![dst.join("1.txt"), dst.join("b").join("2.txt")]);
    assert!(pairs.iter().all(|p| p.source.starts_with(&src)));
}

#[test]
fn directories_are_not_reported() {
    let (_dir, src, dst) = setup();
    fs::create_dir_all(src.join("empty").join("nested")).unwrap();

    let pairs = files_needing_sync(&src, &dst, ComparePolicy::Shallow).unwrap();
    assert_eq!(pairs.len(), 2);
    assert!(pairs.iter().all(|p| p.source.is_file()));
}

#[test]
fn mirrored_file_with_matching_metadata_is_skipped() {
    let (_dir, src, dst) = setup();
    fs::write(dst.join("1.txt"), b"one").unwrap();
    let stamp = FileTime::from_unix_time(1_500_000_000, 0);
    filetime::set_file_mtime(src.join("1.txt"), stamp).unwrap();
    filetime::set_file_mtime(dst.join("1.txt"), stamp).unwrap();

    let pairs = files_needing_sync(&src, &dst, ComparePolicy::Shallow).unwrap();
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].destination, dst.join("b").join("2.txt"));
}

#[test]
fn missing_source_root_is_an_error() {
    let (_dir, src, dst) = setup();
    assert!(files_needing_sync(&src.join("nope"), &dst, ComparePolicy::Shallow).is_err());
}

#[test]
fn walk_reports_sizes() {
    let (_dir, src, _dst) = setup();
    let mut entries = Scanner::walk(&src).unwrap();
    entries.sort_by(|a, b| a.path.cmp(&b.path));
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].size, 3);
    assert!(!entries[0].is_dir);
}
