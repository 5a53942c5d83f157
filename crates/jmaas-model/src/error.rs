use thiserror::Error;

/// Rejection of a job description before anything is registered or started.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SpecError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("invalid mode: {0}")]
    InvalidMode(String),
    #[error("parameter 'qps' is required when 'mode' is set to 'qps'")]
    MissingProfile,
    #[error("'min_latency' must be greater than 0 milliseconds")]
    MinLatency,
    #[error("'max_latency' ({max}) must not be lower than 'min_latency' ({min})")]
    MaxLatency { min: u32, max: u32 },
    #[error("test plan must be a relative path inside the plans directory: {0}")]
    InvalidPlan(String),
}
