//! Logging for jmaas processes: `tracing` subscriber initialisation and, behind the `subscriber` feature, a job
//! event subscriber that writes lifecycle events to the log.

mod logger;
pub use logger::*;

#[cfg(feature = "subscriber")]
mod subscriber;
#[cfg(feature = "subscriber")]
pub use subscriber::*;
