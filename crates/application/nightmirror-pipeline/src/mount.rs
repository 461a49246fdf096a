use std::thread;
use std::time::{Duration, Instant};

use camino::Utf8Path;
use tracing::{debug, info};

use crate::PipelineError;

/// Block until `path` exists, checking every `poll_interval`.
///
/// The sync client only exposes its folder once it has started and signed
/// in, which can take a while after launch. Gives up with
/// [`PipelineError::MountTimeout`] after `ceiling`.
pub fn wait_for_mount(
    path: &Utf8Path,
    poll_interval: Duration,
    ceiling: Duration,
) -> Result<Duration, PipelineError> {
    let start = Instant::now();
    loop {
        if path.exists() {
            let waited = start.elapsed();
            info!("{} is available after {:?}", path, waited);
            return Ok(waited);
        }

        let waited = start.elapsed();
        if waited >= ceiling {
            return Err(PipelineError::MountTimeout {
                path: path.to_owned(),
                waited,
            });
        }

        debug!("Waiting for {} ({:?} elapsed)", path, waited);
        thread::sleep(poll_interval.min(ceiling - waited));
    }
}
