use std::fmt;
use std::io::Read;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

/// Why the supervisor stopped waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeReason {
    /// The controller asked for shutdown.
    Signalled,
    /// The controller's end of the channel closed, usually because it exited.
    Disconnected,
    TimedOut,
}

impl fmt::Display for WakeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WakeReason::Signalled => "shutdown requested",
            WakeReason::Disconnected => "controller disconnected",
            WakeReason::TimedOut => "timed out",
        };
        f.write_str(s)
    }
}

/// Receive side of a one-way shutdown signal.
pub trait LivenessChannel {
    /// Block until a signal arrives, the sender goes away, or `timeout` passes.
    fn wait(&mut self, timeout: Duration) -> WakeReason;
}

impl LivenessChannel for Receiver<()> {
    fn wait(&mut self, timeout: Duration) -> WakeReason {
        match self.recv_timeout(timeout) {
            Ok(()) => WakeReason::Signalled,
            Err(RecvTimeoutError::Disconnected) => WakeReason::Disconnected,
            Err(RecvTimeoutError::Timeout) => WakeReason::TimedOut,
        }
    }
}

/// Liveness carried over a byte stream, typically the helper's stdin.
///
/// Any byte counts as a shutdown request; EOF or a read error means the
/// writer is gone.
pub struct PipeLiveness {
    rx: Receiver<()>,
}

impl PipeLiveness {
    pub fn spawn<R>(mut reader: R) -> Self
    where
        R: Read + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut buf = [0u8; 1];
            if let Ok(1) = reader.read(&mut buf) {
                let _ = tx.send(());
            }
            // Dropping tx reports Disconnected on EOF and errors.
        });
        Self { rx }
    }
}

impl LivenessChannel for PipeLiveness {
    fn wait(&mut self, timeout: Duration) -> WakeReason {
        self.rx.wait(timeout)
    }
}

/// Send side of an in-process liveness channel. Dropping it closes the channel.
#[derive(Debug)]
pub struct LivenessSender {
    tx: Sender<()>,
}

impl LivenessSender {
    pub fn shutdown(self) {
        // A supervisor that already gave up is not an error.
        let _ = self.tx.send(());
    }
}

pub fn liveness_pair() -> (LivenessSender, Receiver<()>) {
    let (tx, rx) = mpsc::channel();
    (LivenessSender { tx }, rx)
}
