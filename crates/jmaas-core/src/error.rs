use std::{io, path::PathBuf};

use jmaas_model::SpecError;
use thiserror::Error;

/// Errors surfaced synchronously by the orchestrator.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Missing or invalid job fields; nothing was registered.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<SpecError> for CoreError {
    fn from(e: SpecError) -> Self {
        CoreError::InvalidArgument(e.to_string())
    }
}

impl From<RunnerError> for CoreError {
    fn from(e: RunnerError) -> Self {
        CoreError::InvalidArgument(e.to_string())
    }
}

/// Terminal failure of a job run, carried by its handle.
///
/// Cloneable so that every caller awaiting the same run observes the same value.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JobFailure {
    /// The external unit terminated abnormally.
    #[error("execution failed: {0}")]
    Execution(String),
    /// The unit body panicked; the worker pool is unaffected.
    #[error("job panicked: {0}")]
    Panicked(String),
    /// The engine was shut down before the unit could be queued.
    #[error("execution engine is shut down")]
    EngineClosed,
    /// The run was dropped without reporting a result.
    #[error("job was abandoned before completion")]
    Abandoned,
}

/// Errors from turning a job config into a runnable unit.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("no runner supports mode '{0}'")]
    NoRunner(String),
    #[error("invalid job config: {0}")]
    InvalidConfig(String),
}

/// Best-effort cleanup problems; logged, never surfaced to callers.
#[derive(Debug, Error)]
pub enum CleanupError {
    #[error("failed to delete artifact {}: {source}", path.display())]
    Artifact {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to flush output sink: {0}")]
    Flush(#[source] io::Error),
}
