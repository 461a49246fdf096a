//! The auxiliary-folder list: one `FolderToSync,OutputLocation[,MaxBackups]`
//! record per line.

use camino::{Utf8Path, Utf8PathBuf};
use nightmirror_core::{is_within, AuxFolderSpec};
use std::collections::HashMap;
use std::fs;
use tracing::{debug, info};

use crate::{ConfigError, DEFAULT_MAX_BACKUPS};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuxConfig {
    pub specs: Vec<AuxFolderSpec>,
}

impl AuxConfig {
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|error| ConfigError::Read {
            path: path.to_owned(),
            error,
        })?;
        let config = Self::parse(path, &content)?;
        info!("Loaded {} auxiliary folders from {}", config.specs.len(), path);
        Ok(config)
    }

    /// Like [`AuxConfig::load`], but a missing file means no auxiliary folders.
    pub fn load_if_present(path: &Utf8Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!("No auxiliary folder list at {}", path);
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// `origin` only labels errors.
    pub fn parse(origin: &Utf8Path, content: &str) -> Result<Self, ConfigError> {
        let mut specs = Vec::new();
        let mut destinations: HashMap<Utf8PathBuf, usize> = HashMap::new();
        for (idx, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let err = |message: String| ConfigError::Line {
                path: origin.to_owned(),
                line: idx + 1,
                message,
            };

            let fields = split_record(line).ok_or_else(|| err("unterminated quote".into()))?;
            let (source, destination, max) = match fields.as_slice() {
                [s, d] => (s, d, None),
                [s, d, m] => (s, d, Some(m)),
                _ => {
                    return Err(err(format!(
                        "expected 2 or 3 columns, found {}",
                        fields.len()
                    )))
                }
            };
            if source.is_empty() || destination.is_empty() {
                return Err(err("folder paths must not be empty".into()));
            }

            let max_backups = match max {
                None => DEFAULT_MAX_BACKUPS,
                Some(m) if m.is_empty() => DEFAULT_MAX_BACKUPS,
                Some(m) => m
                    .parse::<usize>()
                    .map_err(|_| err(format!("invalid max backups {m:?}")))?,
            };
            if max_backups == 0 {
                return Err(err("max backups must be at least 1".into()));
            }

            let source = Utf8PathBuf::from(source.as_str());
            let destination = Utf8PathBuf::from(destination.as_str());
            if is_within(&source, &destination) {
                return Err(err(format!(
                    "output location {destination} is inside {source}"
                )));
            }
            let key: Utf8PathBuf = destination.components().collect();
            if let Some(first) = destinations.insert(key, idx + 1) {
                return Err(err(format!(
                    "output location {destination} is already used on line {first}"
                )));
            }

            specs.push(AuxFolderSpec::new(source, destination, max_backups));
        }
        Ok(Self { specs })
    }
}

/// Split on commas outside double quotes, trimming each field and dropping
/// the quotes. `""` inside quotes is a literal quote. `None` on an
/// unterminated quote.
fn split_record(line: &str) -> Option<Vec<String>> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                chars.next();
                current.push('"');
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current).trim().to_string()),
            _ => current.push(ch),
        }
    }
    if in_quotes {
        return None;
    }
    fields.push(current.trim().to_string());
    Some(fields)
}
