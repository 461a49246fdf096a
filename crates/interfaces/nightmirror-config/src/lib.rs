//! Central configuration: runtime limits and defaults, the JSON settings
//! file, and the auxiliary-folder list.

use camino::Utf8PathBuf;
use nightmirror_core::ErrorKind;
use std::time::Duration;
use thiserror::Error;

pub mod aux_folders;
pub mod settings;

pub use aux_folders::AuxConfig;
pub use settings::Settings;

/// Hard ceiling on how long the sync client may run. 12 hours.
pub const DEFAULT_SUPERVISOR_TIMEOUT_SECS: u64 = 12 * 60 * 60;

/// How often the destination mount is checked while waiting for it.
pub const MOUNT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Give up waiting for the destination mount after this long. 30 minutes.
pub const DEFAULT_MOUNT_CEILING_SECS: u64 = 30 * 60;

/// Time the client is left running after the copy so uploads can start. 15 minutes.
pub const DEFAULT_UPLOAD_GRACE_SECS: u64 = 15 * 60;

/// Snapshots kept per auxiliary folder when the config line does not say.
pub const DEFAULT_MAX_BACKUPS: usize = 5;

pub const DEFAULT_SOURCE_DIR: &str = "ToSync";
pub const DEFAULT_MOUNT_PATH: &str = "G:/My Drive";
pub const DEFAULT_AUX_CONFIG: &str = "extra_sync_folders.csv";
pub const SETTINGS_FILE_NAME: &str = "settings.json";

#[cfg(windows)]
pub const CLIENT_EXE_NAME: &str = "GoogleDriveFS.exe";
#[cfg(not(windows))]
pub const CLIENT_EXE_NAME: &str = "GoogleDriveFS";

/// Log file name prefixes; the run stamp and `.log` are appended.
pub const LOG_PREFIX: &str = "nightmirror";
pub const SUPERVISOR_LOG_PREFIX: &str = "nightmirror-supervisor";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine the config directory")]
    NoConfigDir,
    #[error("failed to read {path}: {error}")]
    Read {
        path: Utf8PathBuf,
        error: std::io::Error,
    },
    #[error("invalid settings in {path}: {error}")]
    Settings {
        path: Utf8PathBuf,
        error: serde_json::Error,
    },
    #[error("{path}:{line}: {message}")]
    Line {
        path: Utf8PathBuf,
        line: usize,
        message: String,
    },
}

impl ConfigError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConfigError::Read { .. } => ErrorKind::Io,
            ConfigError::NoConfigDir | ConfigError::Settings { .. } | ConfigError::Line { .. } => {
                ErrorKind::Configuration
            }
        }
    }
}

/// Clamp the supervisor timeout to at least one second; zero would kill the client at once.
pub fn clamp_timeout_secs(v: u64) -> u64 {
    v.clamp(1, DEFAULT_SUPERVISOR_TIMEOUT_SECS * 2)
}
