use camino::Utf8PathBuf;
use clap::Parser;
use nightmirror_cli::cli::Cli;
use nightmirror_cli::commands::log_usage_error;
use std::fs;
use tempfile::tempdir;

#[test]
fn rejected_command_line_is_written_to_a_run_log() {
    let dir = tempdir().unwrap();
    let log_dir = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    let err = Cli::try_parse_from(["nightmirror", "--mount", "/mnt/drive", "--bogus"]).unwrap_err();

    log_usage_error(&err, &log_dir);

    let logs: Vec<_> = fs::read_dir(&log_dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(logs.len(), 1, "{logs:?}");
    let name = logs[0].file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("nightmirror_") && name.ends_with(".log"), "{name}");
    let text = fs::read_to_string(&logs[0]).unwrap();
    assert!(text.contains("Invalid command line"), "{text}");
    assert!(text.contains("--bogus"), "{text}");
}
