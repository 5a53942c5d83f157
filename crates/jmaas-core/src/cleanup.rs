use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
};

use jmaas_model::{JobId, JobKey, JobName};
use tracing::{debug, info, warn};

use crate::{
    engine::{CompletionHook, completion_hook},
    error::CleanupError,
    events::{JobEvent, JobEventKind, Subscribers},
    handle::JobOutcome,
    registry::JobRegistry,
};

/// Where per-run transient artifacts live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    dir: PathBuf,
}

impl Default for ArtifactLayout {
    fn default() -> Self {
        Self {
            dir: std::env::temp_dir(),
        }
    }
}

impl ArtifactLayout {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[inline]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Tool log of the run: `<dir>/<name>`.
    pub fn log_path(&self, name: &JobName) -> PathBuf {
        self.dir.join(name.as_str())
    }

    /// Staged request body of the run: `<dir>/<name>_body`.
    pub fn body_path(&self, name: &JobName) -> PathBuf {
        self.dir.join(format!("{}_body", name.as_str()))
    }

    /// Every artifact a run may leave behind.
    pub fn paths(&self, name: &JobName) -> [PathBuf; 2] {
        [self.log_path(name), self.body_path(name)]
    }
}

/// Post-completion teardown of a run.
///
/// Steps, in order: artifacts are deleted, the sink is closed, the run is removed from the registry. Taking the sink
/// out of the registry is the guard: only the first invocation for a run does anything.
pub struct CleanupCoordinator {
    registry: Arc<JobRegistry>,
    layout: ArtifactLayout,
    events: Arc<Subscribers>,
}

impl CleanupCoordinator {
    pub fn new(registry: Arc<JobRegistry>, layout: ArtifactLayout, events: Arc<Subscribers>) -> Self {
        Self {
            registry,
            layout,
            events,
        }
    }

    #[inline]
    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    /// Completion hook that cleans up run `id` of `key`.
    pub fn hook(self: &Arc<Self>, key: JobKey, name: JobName, id: JobId) -> CompletionHook {
        let this = Arc::clone(self);
        completion_hook(move |outcome| async move {
            this.run(&key, &name, id, &outcome).await;
        })
    }

    /// Returns `false` if run `id` was already cleaned up.
    pub async fn run(&self, key: &JobKey, name: &JobName, id: JobId, outcome: &JobOutcome) -> bool {
        let Some(sink) = self.registry.take_sink(key, id) else {
            debug!(target: "jmaas.core.cleanup", key = %key, job_id = %id, "already cleaned up");
            return false;
        };

        let terminal = match outcome {
            Ok(done) => {
                info!(target: "jmaas.core.cleanup", key = %key, name = %name, elapsed_ms = done.elapsed.as_millis() as u64, "job succeeded");
                JobEvent::new(JobEventKind::Succeeded, key.clone()).with_elapsed(done.elapsed)
            }
            Err(failure) => {
                warn!(target: "jmaas.core.cleanup", key = %key, name = %name, error = %failure, "job failed");
                JobEvent::new(JobEventKind::Failed, key.clone()).with_reason(failure.to_string())
            }
        };
        self.events.publish(terminal.with_id(id).with_name(name.clone()));

        for path in self.layout.paths(name) {
            if let Err(e) = remove_artifact(&path).await {
                self.failed(key, id, &e);
            }
        }

        if let Err(e) = sink.close() {
            self.failed(key, id, &CleanupError::Flush(e));
        }
        drop(sink);

        self.registry.release(key, id);
        debug!(target: "jmaas.core.cleanup", key = %key, job_id = %id, "job removed from registry");
        self.events.publish(
            JobEvent::new(JobEventKind::Cleaned, key.clone())
                .with_id(id)
                .with_name(name.clone()),
        );
        true
    }

    fn failed(&self, key: &JobKey, id: JobId, err: &CleanupError) {
        warn!(target: "jmaas.core.cleanup", key = %key, job_id = %id, error = %err, "cleanup step failed");
        self.events.publish(
            JobEvent::new(JobEventKind::CleanupFailed, key.clone())
                .with_id(id)
                .with_reason(err.to_string()),
        );
    }
}

async fn remove_artifact(path: &Path) -> Result<(), CleanupError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            debug!(target: "jmaas.core.cleanup", path = %path.display(), "artifact deleted");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(CleanupError::Artifact {
            path: path.to_path_buf(),
            source,
        }),
    }
}
