//! Console plus per-run log file, or console alone when the file cannot be opened.

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use nightmirror_core::RunStamp;
use tracing::warn;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;
use tracing_subscriber::EnvFilter;

/// Keeps the log file writer alive. Dropping it flushes and closes the file.
pub struct LogSession {
    pub log_path: Utf8PathBuf,
    _guard: WorkerGuard,
}

impl LogSession {
    /// Install the global subscriber writing to `<log_dir>/<prefix>_<stamp>.log`,
    /// and to stdout when `console` is set. `RUST_LOG` overrides the level.
    pub fn init(
        log_dir: &Utf8Path,
        prefix: &str,
        stamp: &RunStamp,
        debug: bool,
        console: bool,
    ) -> Result<Self> {
        std::fs::create_dir_all(log_dir)
            .with_context(|| format!("Failed to create log directory {log_dir}"))?;

        let file_name = format!("{prefix}_{stamp}.log");
        let log_path = log_dir.join(&file_name);
        let appender = tracing_appender::rolling::never(log_dir, &file_name);
        let (writer, guard) = tracing_appender::non_blocking(appender);

        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(false);
        let console_layer = console.then(|| {
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_target(false)
        });

        tracing_subscriber::registry()
            .with(level_filter(debug))
            .with(file_layer)
            .with(console_layer)
            .try_init()
            .context("Failed to install log subscriber")?;

        Ok(Self {
            log_path,
            _guard: guard,
        })
    }
}

/// [`LogSession::init`], falling back to [`console_only`] when the log
/// directory is unusable.
pub fn init_logging(
    log_dir: &Utf8Path,
    prefix: &str,
    stamp: &RunStamp,
    debug: bool,
    console: bool,
) -> Option<LogSession> {
    match LogSession::init(log_dir, prefix, stamp, debug, console) {
        Ok(session) => Some(session),
        Err(e) => {
            if let Err(fallback) = console_only(debug) {
                eprintln!("Failed to set up logging: {e:#}; {fallback:#}");
            } else {
                warn!("Logging to the console only: {:#}", e);
            }
            None
        }
    }
}

/// Install a stderr-only subscriber.
pub fn console_only(debug: bool) -> Result<()> {
    tracing_subscriber::registry()
        .with(level_filter(debug))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init()
        .context("Failed to install console subscriber")
}

fn level_filter(debug: bool) -> EnvFilter {
    let default_level = if debug { "debug" } else { "info" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}
