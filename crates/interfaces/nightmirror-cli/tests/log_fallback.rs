use camino::Utf8PathBuf;
use nightmirror_cli::logging::init_logging;
use nightmirror_config::LOG_PREFIX;
use nightmirror_core::RunStamp;
use std::fs;
use tempfile::tempdir;

#[test]
fn unusable_log_dir_falls_back_to_the_console() {
    let dir = tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    let blocker = root.join("not-a-dir");
    fs::write(&blocker, b"").unwrap();
    let stamp = RunStamp::parse("03142025_060000").unwrap();

    let session = init_logging(&blocker.join("logs"), LOG_PREFIX, &stamp, false, true);

    assert!(session.is_none());
    assert!(tracing::dispatcher::has_been_set());
    assert!(!blocker.join("logs").exists());
}
