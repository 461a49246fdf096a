use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

use super::SupervisorError;

/// Number of dot-separated parts in a client version directory name.
pub const VERSION_COMPONENTS: usize = 4;

/// Parse `a.b.c.d` where every part is a plain unsigned integer.
pub fn parse_version(name: &str) -> Option<[u64; VERSION_COMPONENTS]> {
    let mut out = [0u64; VERSION_COMPONENTS];
    let mut parts = name.split('.');
    for slot in out.iter_mut() {
        let part = parts.next()?;
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        *slot = part.parse().ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(out)
}

/// Find the client executable.
///
/// `path` may be the executable itself, a directory holding `exe_name`, or an
/// install root with one subdirectory per version (`120.0.1.0/`), in which
/// case the newest version wins.
pub fn resolve_client_executable(
    path: &Utf8Path,
    exe_name: &str,
) -> Result<Utf8PathBuf, SupervisorError> {
    if path.is_file() {
        return Ok(path.to_owned());
    }
    if !path.is_dir() {
        return Err(SupervisorError::Configuration(format!(
            "client path {path} does not exist"
        )));
    }

    let direct = path.join(exe_name);
    if direct.is_file() {
        return Ok(direct);
    }

    let mut newest: Option<([u64; VERSION_COMPONENTS], Utf8PathBuf)> = None;
    for entry in path.read_dir_utf8()? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let Some(version) = parse_version(entry.file_name()) else {
            continue;
        };
        debug!("Found client version {}", entry.file_name());
        if newest.as_ref().map_or(true, |(best, _)| version > *best) {
            newest = Some((version, entry.into_path()));
        }
    }

    let (_, dir) = newest.ok_or_else(|| {
        SupervisorError::Configuration(format!("no version directory found under {path}"))
    })?;
    let exe = dir.join(exe_name);
    if !exe.is_file() {
        return Err(SupervisorError::Configuration(format!(
            "{exe_name} not found in {dir}"
        )));
    }
    Ok(exe)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn versions_need_exactly_four_numeric_parts() {
        assert_eq!(parse_version("95.0.2.0"), Some([95, 0, 2, 0]));
        assert_eq!(parse_version("1.2.3"), None);
        assert_eq!(parse_version("1.2.3.4.5"), None);
        assert_eq!(parse_version("1.2.x.4"), None);
        assert_eq!(parse_version("1..3.4"), None);
        assert_eq!(parse_version("+1.2.3.4"), None);
    }

    #[test]
    fn numeric_order_beats_string_order() {
        assert!(parse_version("10.0.0.0") > parse_version("9.9.9.9"));
    }
}
