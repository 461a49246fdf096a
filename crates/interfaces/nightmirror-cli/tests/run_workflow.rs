use camino::Utf8PathBuf;
use nightmirror_cli::run::{run, RunOptions};
use nightmirror_config::Settings;
use nightmirror_core::RunStamp;
use std::fs;
use std::time::Duration;
use tempfile::{tempdir, TempDir};

struct Fixture {
    _dir: TempDir,
    root: Utf8PathBuf,
    settings: Settings,
}

fn fixture() -> Fixture {
    let dir = tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();

    let source = root.join("ToSync");
    fs::create_dir_all(source.join("clips")).unwrap();
    fs::write(source.join("run.mkv"), b"full run").unwrap();
    fs::write(source.join("clips").join("pb.mkv"), b"pb").unwrap();

    let splits = root.join("Splits");
    fs::create_dir_all(&splits).unwrap();
    fs::write(splits.join("game.lss"), b"<Run/>").unwrap();

    fs::create_dir_all(root.join("mount")).unwrap();
    let aux_config = root.join("extra_sync_folders.csv");
    fs::write(
        &aux_config,
        format!(
            "# folder,backup root,max\n{},{},2\n{},{}\n",
            splits,
            root.join("backups").join("Splits"),
            root.join("missing"),
            root.join("backups").join("missing"),
        ),
    )
    .unwrap();

    let settings = Settings {
        source_dir: source,
        mount_path: root.join("mount"),
        dest_subdir: "Videos".into(),
        archive_root: root.join("archive"),
        aux_config,
        log_dir: root.join("logs"),
        upload_grace_secs: 0,
        mount_ceiling_secs: 1,
        ..Settings::default()
    };
    Fixture {
        _dir: dir,
        root,
        settings,
    }
}

fn options(settings: Settings, stamp: &str) -> RunOptions {
    RunOptions {
        stamp: RunStamp::parse(stamp).unwrap(),
        skip_client: true,
        mount_poll: Duration::from_millis(10),
        ..RunOptions::new(settings)
    }
}

#[test]
fn nightly_run_mirrors_archives_and_backs_up() {
    let fx = fixture();

    let summary = run(&options(fx.settings.clone(), "03012025_020000")).unwrap();

    assert_eq!(summary.files_copied, 2);
    assert_eq!(summary.bytes_copied, 10);
    assert_eq!(summary.files_archived, 2);
    assert_eq!(summary.snapshots_created, 1);
    assert_eq!(summary.aux_failed, 1);
    assert!(summary.supervisor.is_none());

    let videos = fx.root.join("mount").join("Videos");
    assert_eq!(fs::read(videos.join("clips").join("pb.mkv")).unwrap(), b"pb");
    let archive = fx.root.join("archive").join("SyncStarted_03012025_020000");
    assert_eq!(fs::read(archive.join("run.mkv")).unwrap(), b"full run");
    assert!(!fx.settings.source_dir.join("run.mkv").exists());
    assert!(fx
        .root
        .join("backups")
        .join("Splits")
        .join("03012025_020000")
        .join("game.lss")
        .is_file());
}

#[test]
fn second_run_with_nothing_new_is_quiet() {
    let fx = fixture();
    run(&options(fx.settings.clone(), "03012025_020000")).unwrap();

    let summary = run(&options(fx.settings.clone(), "03022025_020000")).unwrap();

    assert_eq!(summary.files_copied, 0);
    assert_eq!(summary.files_archived, 0);
    assert_eq!(summary.snapshots_created, 0);
    assert!(!fx
        .root
        .join("archive")
        .join("SyncStarted_03022025_020000")
        .exists());
}

#[test]
fn missing_mount_fails_the_run() {
    let fx = fixture();
    let settings = Settings {
        mount_path: fx.root.join("not-mounted"),
        ..fx.settings.clone()
    };

    let err = run(&options(settings, "03012025_020000")).unwrap_err();

    assert!(format!("{err:#}").contains("never appeared"), "{err:#}");
    assert!(fx.settings.source_dir.join("run.mkv").exists());
}

#[test]
fn client_is_required_unless_skipped() {
    let fx = fixture();
    let opts = RunOptions {
        skip_client: false,
        ..options(fx.settings.clone(), "03012025_020000")
    };

    let err = run(&opts).unwrap_err();
    assert!(err.to_string().contains("--client"), "{err}");
}

#[cfg(unix)]
#[test]
fn in_process_supervisor_stops_the_client_after_the_run() {
    use nightmirror_cli::supervisor_link::SupervisorReport;
    use nightmirror_infra::WakeReason;

    let sleep = Utf8PathBuf::from("/bin/sleep");
    if !sleep.is_file() {
        return;
    }
    let fx = fixture();
    let settings = Settings {
        client_path: Some(sleep),
        client_args: "600".into(),
        in_process_supervisor: true,
        ..fx.settings.clone()
    };
    let opts = RunOptions {
        skip_client: false,
        ..options(settings, "03012025_020000")
    };

    let summary = run(&opts).unwrap();

    match summary.supervisor {
        Some(SupervisorReport::InProcess(outcome)) => {
            assert_eq!(outcome.reason, WakeReason::Signalled);
            assert!(!outcome.status.success());
        }
        other => panic!("unexpected supervisor report {other:?}"),
    }
}
