use camino::{Utf8Path, Utf8PathBuf};
use directories::ProjectDirs;
use nightmirror_core::{utf8_path, ComparePolicy};
use serde::{Deserialize, Serialize};
use std::fs;
use tracing::{debug, info};

use crate::{
    ConfigError, DEFAULT_AUX_CONFIG, DEFAULT_MOUNT_CEILING_SECS, DEFAULT_MOUNT_PATH,
    DEFAULT_SOURCE_DIR, DEFAULT_SUPERVISOR_TIMEOUT_SECS, DEFAULT_UPLOAD_GRACE_SECS,
    SETTINGS_FILE_NAME,
};

const QUALIFIER: &str = "com";
const ORG: &str = "nightmirror";
const APP: &str = "nightmirror";

/// Persistent defaults for a nightly run. Every field can be overridden on
/// the command line; unknown keys are rejected so typos surface early.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Local folder whose files are pushed to the drive and then archived.
    pub source_dir: Utf8PathBuf,
    /// Where the sync client mounts the drive.
    pub mount_path: Utf8PathBuf,
    /// Folder under the mount that receives the copy; empty means the mount itself.
    pub dest_subdir: Utf8PathBuf,
    /// Parent of the `SyncStarted_<stamp>` archive folders.
    pub archive_root: Utf8PathBuf,
    pub client_path: Option<Utf8PathBuf>,
    pub client_args: String,
    pub aux_config: Utf8PathBuf,
    pub log_dir: Utf8PathBuf,
    pub upload_grace_secs: u64,
    pub supervisor_timeout_secs: u64,
    pub mount_ceiling_secs: u64,
    pub aux_compare: ComparePolicy,
    pub mirror_compare: ComparePolicy,
    pub in_process_supervisor: bool,
    pub fail_on_error: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            source_dir: DEFAULT_SOURCE_DIR.into(),
            mount_path: DEFAULT_MOUNT_PATH.into(),
            dest_subdir: Utf8PathBuf::new(),
            archive_root: ".".into(),
            client_path: None,
            client_args: String::new(),
            aux_config: DEFAULT_AUX_CONFIG.into(),
            log_dir: ".".into(),
            upload_grace_secs: DEFAULT_UPLOAD_GRACE_SECS,
            supervisor_timeout_secs: DEFAULT_SUPERVISOR_TIMEOUT_SECS,
            mount_ceiling_secs: DEFAULT_MOUNT_CEILING_SECS,
            aux_compare: ComparePolicy::Shallow,
            mirror_compare: ComparePolicy::Shallow,
            in_process_supervisor: false,
            fail_on_error: false,
        }
    }
}

impl Settings {
    /// `<config_dir>/settings.json` for the current user.
    pub fn default_path() -> Result<Utf8PathBuf, ConfigError> {
        let dirs = ProjectDirs::from(QUALIFIER, ORG, APP).ok_or(ConfigError::NoConfigDir)?;
        let dir = utf8_path(dirs.config_dir().to_path_buf()).map_err(|_| ConfigError::NoConfigDir)?;
        Ok(dir.join(SETTINGS_FILE_NAME))
    }

    /// Load from `path`, or from [`Settings::default_path`] when `None`.
    /// A missing file yields the defaults.
    pub fn load(path: Option<&Utf8Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p.to_owned(),
            None => Self::default_path()?,
        };
        if !path.exists() {
            debug!("No settings at {}, using defaults", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).map_err(|error| ConfigError::Read {
            path: path.clone(),
            error,
        })?;
        let settings = serde_json::from_str(&content)
            .map_err(|error| ConfigError::Settings { path: path.clone(), error })?;
        info!("Loaded settings from {}", path);
        Ok(settings)
    }

    /// The folder the mirror is written to.
    pub fn destination(&self) -> Utf8PathBuf {
        if self.dest_subdir.as_str().is_empty() {
            self.mount_path.clone()
        } else {
            self.mount_path.join(&self.dest_subdir)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn temp_root() -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        (dir, root)
    }

    #[test]
    fn missing_file_gives_defaults() {
        let (_d, root) = temp_root();
        let settings = Settings::load(Some(&root.join("settings.json"))).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let (_d, root) = temp_root();
        let path = root.join("settings.json");
        fs::write(
            &path,
            r#"{ "mount_path": "/mnt/drive", "dest_subdir": "Videos", "aux_compare": "content" }"#,
        )
        .unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.destination(), Utf8PathBuf::from("/mnt/drive/Videos"));
        assert_eq!(settings.aux_compare, ComparePolicy::Content);
        assert_eq!(settings.mirror_compare, ComparePolicy::Shallow);
        assert_eq!(settings.upload_grace_secs, DEFAULT_UPLOAD_GRACE_SECS);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let (_d, root) = temp_root();
        let path = root.join("settings.json");
        fs::write(&path, r#"{ "mount_pth": "/mnt/drive" }"#).unwrap();

        let err = Settings::load(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Settings { .. }));
        assert_eq!(err.kind(), nightmirror_core::ErrorKind::Configuration);
    }

    #[test]
    fn empty_subdir_means_the_mount_itself() {
        let settings = Settings {
            mount_path: "/mnt/drive".into(),
            ..Settings::default()
        };
        assert_eq!(settings.destination(), Utf8PathBuf::from("/mnt/drive"));
    }
}
