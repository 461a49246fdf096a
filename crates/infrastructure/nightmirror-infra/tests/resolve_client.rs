use camino::Utf8PathBuf;
use nightmirror_core::ErrorKind;
use nightmirror_infra::resolve_client_executable;
use std::fs;
use tempfile::tempdir;

const EXE: &str = "client.exe";

fn root() -> (tempfile::TempDir, Utf8PathBuf) {
    let dir = tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    (dir, root)
}

fn install(root: &Utf8PathBuf, version: &str) -> Utf8PathBuf {
    let dir = root.join(version);
    fs::create_dir_all(&dir).unwrap();
    let exe = dir.join(EXE);
    fs::write(&exe, b"").unwrap();
    exe
}

#[test]
fn file_path_is_used_as_is() {
    let (_d, root) = root();
    let exe = install(&root, "1.0.0.0");
    assert_eq!(resolve_client_executable(&exe, EXE).unwrap(), exe);
}

#[test]
fn directory_with_executable_is_used_directly() {
    let (_d, root) = root();
    fs::write(root.join(EXE), b"").unwrap();
    install(&root, "2.0.0.0");
    assert_eq!(resolve_client_executable(&root, EXE).unwrap(), root.join(EXE));
}

#[test]
fn newest_version_directory_wins() {
    let (_d, root) = root();
    install(&root, "9.9.9.9");
    let newest = install(&root, "10.0.0.1");
    install(&root, "10.0.0.0");
    fs::create_dir_all(root.join("99.0.0")).unwrap();
    fs::create_dir_all(root.join("logs")).unwrap();

    assert_eq!(resolve_client_executable(&root, EXE).unwrap(), newest);
}

#[test]
fn no_version_directory_is_a_configuration_error() {
    let (_d, root) = root();
    fs::create_dir_all(root.join("logs")).unwrap();
    let err = resolve_client_executable(&root, EXE).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn missing_path_is_a_configuration_error() {
    let (_d, root) = root();
    let err = resolve_client_executable(&root.join("nope"), EXE).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}
