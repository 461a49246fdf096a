pub mod supervisor;

// Re-exports for convenience
pub use supervisor::{
    liveness_pair, resolve_client_executable, supervise_external_process, ClientCommand,
    LivenessChannel, LivenessSender, PipeLiveness, SupervisionOutcome, SupervisorError,
    WakeReason,
};
