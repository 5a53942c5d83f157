use std::sync::Arc;

use jmaas_model::JobConfig;
use tracing::{instrument, trace};

use crate::{
    engine::JobUnit,
    error::RunnerError,
    runner::{BuildContext, Runner},
    sink::RedirectableSink,
};

/// Ordered set of runners; the first one supporting a config builds its unit.
#[derive(Default)]
pub struct RunnerRouter {
    runners: Vec<Arc<dyn Runner>>,
    ctx: BuildContext,
}

impl RunnerRouter {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn with_context(mut self, ctx: BuildContext) -> Self {
        self.ctx = ctx;
        self
    }

    #[inline]
    pub fn with_runner(mut self, runner: Arc<dyn Runner>) -> Self {
        self.register(runner);
        self
    }

    #[inline]
    pub fn register(&mut self, runner: Arc<dyn Runner>) {
        self.runners.push(runner);
    }

    #[inline]
    pub fn context(&self) -> &BuildContext {
        &self.ctx
    }

    pub fn is_empty(&self) -> bool {
        self.runners.is_empty()
    }

    pub fn pick(&self, config: &JobConfig) -> Option<&Arc<dyn Runner>> {
        self.runners.iter().find(|r| r.supports(config))
    }

    #[instrument(level = "trace", skip_all, fields(key = %config.key(), mode = config.mode()))]
    pub fn build(
        &self,
        config: Arc<JobConfig>,
        sink: Arc<RedirectableSink>,
    ) -> Result<JobUnit, RunnerError> {
        let r = self
            .pick(&config)
            .ok_or_else(|| RunnerError::NoRunner(config.mode().to_string()))?;

        let unit = r.build_unit(config, sink, &self.ctx)?;
        trace!(runner = r.name(), "runner built unit successfully");
        Ok(unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::discard;
    use jmaas_model::{JobKey, JobSpec};
    use std::time::SystemTime;

    struct ModeRunner(&'static str);

    impl Runner for ModeRunner {
        fn name(&self) -> &'static str {
            self.0
        }
        fn supports(&self, config: &JobConfig) -> bool {
            config.mode() == self.0
        }
        fn build_unit(
            &self,
            _config: Arc<JobConfig>,
            _sink: Arc<RedirectableSink>,
            _ctx: &BuildContext,
        ) -> Result<JobUnit, RunnerError> {
            Ok(Box::pin(async { Ok(()) }))
        }
    }

    fn config(mode: &str) -> Arc<JobConfig> {
        let mut spec = JobSpec::new("example.com", mode);
        if mode == "qps" {
            spec = spec.with_profile("1,10,60");
        }
        Arc::new(
            JobConfig::new(JobKey::from("t1"), "inst", "test.jmx", spec, SystemTime::now()).unwrap(),
        )
    }

    fn sink() -> Arc<RedirectableSink> {
        Arc::new(RedirectableSink::new(JobKey::from("t1"), discard()))
    }

    #[test]
    fn picks_first_supporting_runner() {
        let router = RunnerRouter::new()
            .with_runner(Arc::new(ModeRunner("qps")))
            .with_runner(Arc::new(ModeRunner("concurrency")));

        assert_eq!(router.pick(&config("concurrency")).map(|r| r.name()), Some("concurrency"));
        assert_eq!(router.pick(&config("qps")).map(|r| r.name()), Some("qps"));
    }

    #[test]
    fn build_without_runner_fails() {
        let router = RunnerRouter::new().with_runner(Arc::new(ModeRunner("qps")));
        let err = router.build(config("concurrency"), sink()).err().unwrap();
        assert!(matches!(err, RunnerError::NoRunner(mode) if mode == "concurrency"));
    }
}
