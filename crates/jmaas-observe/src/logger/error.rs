use thiserror::Error;

/// Failure to set up process logging from a [`LoggerConfig`](crate::LoggerConfig).
#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("JMAAS_LOG_FORMAT: unknown format {0:?} (expected text, json or journald)")]
    InvalidFormat(String),
    #[error("JMAAS_LOG_FORMAT: journald needs Linux and the `journald` feature")]
    JournaldNotSupported,
    #[error("JMAAS_LOG_TARGET: unknown target {0:?} (expected stdout or stderr)")]
    InvalidTarget(String),
    #[error("JMAAS_LOG_LEVEL: invalid filter directives {0:?}")]
    InvalidLogLevel(String),
    #[error("a global tracing subscriber is already installed")]
    AlreadyInitialized,
    #[error("logger initialisation failed: {0}")]
    InitializationFailed(String),
}
