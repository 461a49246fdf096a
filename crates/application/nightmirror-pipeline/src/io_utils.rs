use std::io;
use std::path::Path;
use std::thread;
use std::time::Duration;

/// Rename, retrying transient failures (virus scanners and sync clients like
/// to hold fresh files open for a moment). Cross-device and missing-source
/// failures are returned immediately.
pub(crate) fn robust_rename(from: &Path, to: &Path) -> io::Result<()> {
    let mut attempt = 0u32;
    let max_attempts = 8u32;
    let mut backoff = Duration::from_millis(50);

    loop {
        match std::fs::rename(from, to) {
            Ok(()) => return Ok(()),
            Err(e) => {
                attempt += 1;
                if attempt >= max_attempts
                    || is_cross_device(&e)
                    || e.kind() == io::ErrorKind::NotFound
                {
                    return Err(e);
                }
                thread::sleep(backoff);
                backoff = std::cmp::min(backoff * 2, Duration::from_millis(2000));
            }
        }
    }
}

pub(crate) fn is_cross_device(e: &io::Error) -> bool {
    #[cfg(unix)]
    {
        // EXDEV
        e.raw_os_error() == Some(18)
    }
    #[cfg(windows)]
    {
        // ERROR_NOT_SAME_DEVICE
        e.raw_os_error() == Some(17)
    }
    #[cfg(not(any(unix, windows)))]
    {
        let _ = e;
        false
    }
}

/// Staging name next to `target` used while a copy is in flight.
pub(crate) fn staging_path(target: &camino::Utf8Path) -> camino::Utf8PathBuf {
    let name = target.file_name().unwrap_or("file");
    target.with_file_name(format!(".{name}.nightmirror-tmp"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8Path;

    #[test]
    fn staging_path_is_hidden_sibling() {
        assert_eq!(
            staging_path(Utf8Path::new("/mnt/drive/a/report.pdf")),
            Utf8Path::new("/mnt/drive/a/.report.pdf.nightmirror-tmp")
        );
    }

    #[test]
    fn missing_source_fails_without_retrying() {
        let dir = tempfile::tempdir().unwrap();
        let start = std::time::Instant::now();
        let err = robust_rename(&dir.path().join("nope"), &dir.path().join("dst")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(start.elapsed() < Duration::from_millis(500));
    }
}
