use std::sync::Arc;

use jmaas_core::{BuildContext, JobFailure, JobUnit, RedirectableSink, Runner, RunnerError};
use jmaas_model::JobConfig;
use tracing::trace;

use crate::{
    process::{execute, stage},
    provider::ProcessProvider,
};

/// Runner executing the process described by a [`ProcessProvider`].
///
/// The command is resolved at build time, so a config the provider rejects fails the submission. Staging and the
/// process itself only happen when a worker polls the unit.
pub struct ProcRunner<P> {
    name: &'static str,
    provider: P,
}

impl<P: ProcessProvider> ProcRunner<P> {
    pub fn new(provider: P) -> Self {
        Self {
            name: provider.name(),
            provider,
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    #[inline]
    pub fn provider(&self) -> &P {
        &self.provider
    }
}

impl<P: ProcessProvider> Runner for ProcRunner<P> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn supports(&self, config: &JobConfig) -> bool {
        self.provider.supports(config)
    }

    fn build_unit(
        &self,
        config: Arc<JobConfig>,
        sink: Arc<RedirectableSink>,
        ctx: &BuildContext,
    ) -> Result<JobUnit, RunnerError> {
        let command = self
            .provider
            .command(&config, ctx.artifacts())
            .map_err(|e| RunnerError::InvalidConfig(e.to_string()))?;
        let input = self.provider.input(&config);
        let staged = self.provider.staged(&config, ctx.artifacts());
        let runner = self.name;

        Ok(Box::pin(async move {
            trace!(target: "jmaas.exec.proc", runner, key = %config.key(), name = %config.name(), "unit starting");
            stage(&staged).await?;
            execute(&command, input, &sink).await?;
            Ok::<(), JobFailure>(())
        }))
    }
}
