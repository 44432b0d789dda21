//! Replication Relay Error Hierarchy
//!
//! Defines error types for the relay control plane, categorized by the
//! subsystem that raises them: checkpoint persistence, configuration,
//! task lifecycle, and the reconfiguration transaction itself.

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration loading or validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Checkpoint file persistence failures
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    /// Failures while swapping in a freshly built slave instance
    #[error(transparent)]
    Reconfigure(#[from] ReconfigureError),

    /// Unrecoverable failures requiring process termination
    #[error("Fatal error: {0}")]
    Fatal(String),
}

/// Errors raised by the checkpoint store while reading or rewriting the
/// on-disk replay position record.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    /// Open/seek/read/write/sync/truncate failures on the checkpoint file
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A brand-new checkpoint file with no recorded position is not a valid
    /// starting state; the operator must seed it.
    #[error("checkpoint file is empty, seed it as \"<source_name>,<offset>\"")]
    Empty,

    /// The record has no source segment before the comma
    #[error("checkpoint record is missing its source name")]
    Malformed,
}

/// Task scheduling failures when launching a detached ingest/apply task.
#[derive(Debug, thiserror::Error)]
pub enum ThreadStartError {
    /// No async runtime is available to host the task
    #[error("no runtime available to spawn the {role} task")]
    NoRuntime { role: &'static str },

    /// The scheduling primitive rejected the task
    #[error("failed to schedule the {role} task: {reason}")]
    SpawnFailed { role: &'static str, reason: String },
}

/// Ring buffer allocation failures.
#[derive(Debug, thiserror::Error)]
#[error("ring buffer allocation of {bytes} bytes failed")]
pub struct BufferAllocError {
    pub bytes: usize,
}

/// A reconfiguration attempt failed.
///
/// Construction-phase failures leave the previous instance completely
/// untouched; start-phase failures mean the previous instance was rolled
/// back to and keeps serving (the orchestrator reports `Degraded`).
#[derive(Debug, thiserror::Error)]
pub enum ReconfigureError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    #[error(transparent)]
    BufferAlloc(#[from] BufferAllocError),

    #[error("failed to start replacement task")]
    TaskStart(#[from] ThreadStartError),
}

// ============== Conversion Implementations ============== //
impl From<ThreadStartError> for Error {
    fn from(e: ThreadStartError) -> Self {
        Error::Reconfigure(ReconfigureError::TaskStart(e))
    }
}

impl From<BufferAllocError> for Error {
    fn from(e: BufferAllocError) -> Self {
        Error::Reconfigure(ReconfigureError::BufferAlloc(e))
    }
}
