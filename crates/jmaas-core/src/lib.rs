//! Job orchestration core: keyed deduplication, redirectable output and exactly-once cleanup.
//!
//! The [`Orchestrator`] is the entry point. It validates a [`jmaas_model::JobSpec`], builds a runnable unit through the
//! [`RunnerRouter`], registers it under its key in the [`JobRegistry`] and hands it to the bounded [`ExecutionEngine`].
//! Output produced by the unit flows through a [`RedirectableSink`] that later callers can [`Orchestrator::attach`] to.

pub mod error;
pub use error::{CleanupError, CoreError, JobFailure, RunnerError};

pub mod sink;
pub use sink::{
    Capture, Destination, OutputStream, RedirectableSink, STREAM_CAPACITY, discard, stdout, stream,
    stream_with_capacity,
};

pub mod handle;
pub use handle::{Completer, Completion, JobHandle, JobOutcome, JobState};

pub mod engine;
pub use engine::{CompletionHook, ExecutionEngine, HookFuture, JobUnit, completion_hook};

pub mod registry;
pub use registry::{Admission, JobRecord, JobRegistry};

pub mod cleanup;
pub use cleanup::{ArtifactLayout, CleanupCoordinator};

pub mod runner;
pub use runner::{BuildContext, Runner};

pub mod router;
pub use router::RunnerRouter;

pub mod events;
pub use events::{JobEvent, JobEventKind, Subscribe, Subscribers};

pub mod config;
pub use config::OrchestratorConfig;

mod system;
pub use system::instance_id;

mod orchestrator;
pub use orchestrator::Orchestrator;
