//! Process-backed runners for jmaas jobs.
//!
//! A [`ProcessProvider`] describes the external process of a job (command, standard input, staged files);
//! [`ProcRunner`] turns it into a unit that streams the process output into the job sink.

mod error;
pub use error::{ExecError, ExecResult};

pub mod provider;
pub use provider::{CommandSpec, ProcessProvider, StagedFile};

pub mod process;
pub mod util;

mod runner;
pub use runner::ProcRunner;

#[cfg(feature = "jmeter")]
mod jmeter;
#[cfg(feature = "jmeter")]
pub use jmeter::JMeterProvider;

#[cfg(any(feature = "shell", test))]
mod shell;
#[cfg(any(feature = "shell", test))]
pub use shell::ShellProvider;

pub mod prelude {
    pub use crate::ProcRunner;
    pub use crate::error::{ExecError, ExecResult};
    #[cfg(feature = "jmeter")]
    pub use crate::jmeter::JMeterProvider;
    pub use crate::provider::{CommandSpec, ProcessProvider};
}
