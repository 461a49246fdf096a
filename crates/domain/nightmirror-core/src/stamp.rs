use chrono::{Local, NaiveDateTime, Timelike};
use std::fmt;

/// Directory and file-name timestamp format: `MMDDYYYY_HHMMSS`.
pub const STAMP_FORMAT: &str = "%m%d%Y_%H%M%S";

/// Timestamp of one run, used to name logs, archive folders and snapshots.
///
/// Ordering follows the embedded date and time, not the rendered string, so
/// stamps from different years compare correctly even though the format
/// leads with the month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunStamp(NaiveDateTime);

impl RunStamp {
    pub fn now() -> Self {
        Self::from_datetime(Local::now().naive_local())
    }

    /// Sub-second precision is dropped so the value survives a format round trip.
    pub fn from_datetime(dt: NaiveDateTime) -> Self {
        Self(dt.with_nanosecond(0).unwrap_or(dt))
    }

    pub fn parse(s: &str) -> Option<Self> {
        // Exact width guards against chrono accepting unpadded fields.
        if s.len() != 15 || s.as_bytes()[8] != b'_' {
            return None;
        }
        if !s
            .bytes()
            .enumerate()
            .all(|(i, b)| i == 8 || b.is_ascii_digit())
        {
            return None;
        }
        NaiveDateTime::parse_from_str(s, STAMP_FORMAT).ok().map(Self)
    }

    /// Stamp `secs` seconds later; handy when several snapshots are taken in one process.
    pub fn plus_seconds(&self, secs: i64) -> Self {
        Self(self.0 + chrono::Duration::seconds(secs))
    }
}

impl fmt::Display for RunStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(STAMP_FORMAT))
    }
}
