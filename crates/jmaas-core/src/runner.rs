use std::sync::Arc;

use jmaas_model::JobConfig;

use crate::{cleanup::ArtifactLayout, engine::JobUnit, error::RunnerError, sink::RedirectableSink};

/// Shared context handed to every runner when it builds a unit.
#[derive(Debug, Clone, Default)]
pub struct BuildContext {
    artifacts: ArtifactLayout,
}

impl BuildContext {
    pub fn new(artifacts: ArtifactLayout) -> Self {
        Self { artifacts }
    }

    #[inline]
    pub fn artifacts(&self) -> &ArtifactLayout {
        &self.artifacts
    }
}

/// Turns an admitted job config into a runnable unit.
///
/// Building happens synchronously at submission, so a config the runner cannot execute is rejected before anything is
/// registered. The returned unit must write all of its output to `sink` before it resolves.
pub trait Runner: Send + Sync {
    fn name(&self) -> &'static str;

    fn supports(&self, config: &JobConfig) -> bool;

    fn build_unit(
        &self,
        config: Arc<JobConfig>,
        sink: Arc<RedirectableSink>,
        ctx: &BuildContext,
    ) -> Result<JobUnit, RunnerError>;
}
