use camino::Utf8PathBuf;
use nightmirror_core::{AuxFolderSpec, RunStamp, Snapshot};

fn snap(name: &str) -> Snapshot {
    Snapshot::parse(&Utf8PathBuf::from(format!("/backups/{name}"))).unwrap()
}

#[test]
fn sort_uses_embedded_time_not_name() {
    let mut snaps = vec![
        snap("01052024_000000"),
        snap("12312023_235959"),
        snap("01042024_120000"),
    ];
    Snapshot::sort(&mut snaps);

    let names: Vec<String> = snaps.iter().map(|s| s.stamp.to_string()).collect();
    assert_eq!(
        names,
        vec!["12312023_235959", "01042024_120000", "01052024_000000"]
    );
}

#[test]
fn snapshot_path_is_stamp_under_destination_root() {
    let spec = AuxFolderSpec::new("/home/me/Splits", "/backups/splits", 3);
    let stamp = RunStamp::parse("06152024_221500").unwrap();
    assert_eq!(
        spec.snapshot_path(&stamp),
        Utf8PathBuf::from("/backups/splits/06152024_221500")
    );
    assert_eq!(spec.label(), "Splits");
}

#[test]
fn plus_seconds_advances_stamp() {
    let stamp = RunStamp::parse("06152024_235959").unwrap();
    assert_eq!(stamp.plus_seconds(1).to_string(), "06162024_000000");
}
