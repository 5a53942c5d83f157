use std::path::PathBuf;

use jmaas_core::JobFailure;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("non-zero exit code: {code}")]
    NonZeroExit { code: i32 },
    #[error("spawn failed: {0}")]
    Spawn(String),
    #[error("killed by signal")]
    KilledBySignal,
    #[error("missing program")]
    MissingProgram,
    #[error("failed to stage {}: {reason}", path.display())]
    Stage { path: PathBuf, reason: String },
    #[error("io error: {0}")]
    Io(String),
}

pub type ExecResult<T> = Result<T, ExecError>;

impl From<std::io::Error> for ExecError {
    fn from(e: std::io::Error) -> Self {
        ExecError::Io(e.to_string())
    }
}

impl From<ExecError> for JobFailure {
    fn from(e: ExecError) -> Self {
        JobFailure::Execution(e.to_string())
    }
}
