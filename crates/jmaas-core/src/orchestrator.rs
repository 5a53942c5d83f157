use std::{sync::Arc, time::SystemTime};

use jmaas_model::{JobConfig, JobInfo, JobKey, JobSpec, SpecError};
use tracing::{debug, info, warn};

use crate::{
    cleanup::CleanupCoordinator,
    config::OrchestratorConfig,
    engine::{ExecutionEngine, JobUnit},
    error::CoreError,
    events::{JobEvent, JobEventKind, Subscribe, Subscribers},
    handle::JobHandle,
    registry::{Admission, JobRecord, JobRegistry},
    router::RunnerRouter,
    runner::BuildContext,
    sink::{Destination, RedirectableSink},
};

/// Public entry point: keyed submission, output attachment and lookup of load-test jobs.
///
/// At most one run per key is in flight. A submission for a key that is already registered returns the registered
/// run's handle and starts nothing. Every admitted run is cleaned up exactly once when it terminates.
pub struct Orchestrator {
    config: OrchestratorConfig,
    router: RunnerRouter,
    registry: Arc<JobRegistry>,
    engine: ExecutionEngine,
    cleanup: Arc<CleanupCoordinator>,
    events: Arc<Subscribers>,
}

impl Orchestrator {
    /// Start the worker pool and subscriber delivery on the current Tokio runtime.
    ///
    /// The router's build context is replaced by one derived from `config`.
    pub fn new(
        config: OrchestratorConfig,
        router: RunnerRouter,
        subscribers: Vec<Arc<dyn Subscribe>>,
    ) -> Result<Self, CoreError> {
        config.validate()?;
        if router.is_empty() {
            warn!(target: "jmaas.core.orchestrator", "no runners registered; every submission will be rejected");
        }

        let router = router.with_context(BuildContext::new(config.artifacts.clone()));
        let registry = Arc::new(JobRegistry::new());
        let events = Arc::new(Subscribers::new(subscribers));
        let cleanup = Arc::new(CleanupCoordinator::new(
            Arc::clone(&registry),
            config.artifacts.clone(),
            Arc::clone(&events),
        ));
        let engine = ExecutionEngine::new(config.workers);

        info!(
            target: "jmaas.core.orchestrator",
            workers = config.workers,
            modes = ?config.modes,
            instance_id = %config.instance_id,
            artifacts = %config.artifacts.dir().display(),
            "orchestrator started"
        );

        Ok(Self {
            config,
            router,
            registry,
            engine,
            cleanup,
            events,
        })
    }

    #[inline]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Submit a run for `key`, or join the one already registered under it.
    ///
    /// Every chunk of output is also written to `primary` for the whole run. Validation happens before any state is
    /// touched; on error nothing is registered.
    pub fn submit(
        &self,
        key: impl Into<JobKey>,
        spec: JobSpec,
        primary: Destination,
    ) -> Result<JobHandle, CoreError> {
        let config = JobConfig::new(
            key.into(),
            self.config.instance_id.as_str(),
            &self.config.default_plan,
            spec,
            SystemTime::now(),
        )?;
        if !self.config.supports_mode(config.mode()) {
            return Err(SpecError::InvalidMode(config.mode().to_string()).into());
        }

        let config = Arc::new(config);
        let key = config.key().clone();
        let sink = Arc::new(RedirectableSink::new(key.clone(), primary));
        let unit = self.router.build(Arc::clone(&config), Arc::clone(&sink))?;

        match self.registry.admit(Arc::clone(&config), sink) {
            Admission::Joined(handle) => {
                warn!(target: "jmaas.core.orchestrator", key = %key, job_id = %handle.id(), "job is already running; joining it");
                self.events.publish(
                    JobEvent::new(JobEventKind::Deduplicated, key).with_id(handle.id()),
                );
                Ok(handle)
            }
            Admission::Fresh { handle, completer } => {
                let id = handle.id();
                let name = config.name().clone();

                self.events.publish(
                    JobEvent::new(JobEventKind::Submitted, key.clone())
                        .with_id(id)
                        .with_name(name.clone()),
                );

                let started = JobEvent::new(JobEventKind::Started, key.clone())
                    .with_id(id)
                    .with_name(name.clone());
                let events = Arc::clone(&self.events);
                let unit: JobUnit = Box::pin(async move {
                    events.publish(JobEvent {
                        at: SystemTime::now(),
                        ..started
                    });
                    unit.await
                });

                let hook = self.cleanup.hook(key.clone(), name.clone(), id);
                self.engine.dispatch(completer, unit, Some(hook));

                info!(target: "jmaas.core.orchestrator", key = %key, name = %name, job_id = %id, mode = config.mode(), host = config.host(), "job submitted");
                Ok(handle)
            }
        }
    }

    /// Re-point the attached output of the run under `key` to `dest`.
    ///
    /// Returns `None`, dropping `dest`, when no run is registered or the run is being cleaned up.
    pub fn attach(&self, key: &JobKey, dest: Destination) -> Option<JobHandle> {
        let handle = self.registry.handle(key)?;
        let (id, sink) = self.registry.sink(key)?;
        if id != handle.id() || !sink.rebind(dest) {
            debug!(target: "jmaas.core.orchestrator", key = %key, "attach refused; job is being cleaned up");
            return None;
        }
        if let Err(e) = sink.flush() {
            debug!(target: "jmaas.core.orchestrator", key = %key, error = %e, "flush after attach failed");
        }

        debug!(target: "jmaas.core.orchestrator", key = %key, job_id = %id, "output attached");
        self.events
            .publish(JobEvent::new(JobEventKind::Attached, key.clone()).with_id(id));
        Some(handle)
    }

    pub fn lookup(&self, key: &JobKey) -> Option<JobRecord> {
        self.registry.record(key)
    }

    pub fn handle(&self, key: &JobKey) -> Option<JobHandle> {
        self.registry.handle(key)
    }

    /// Snapshot of every registered run, ordered by key.
    pub fn jobs(&self) -> Vec<JobInfo> {
        let mut jobs: Vec<JobInfo> = self.registry.records().iter().map(JobRecord::info).collect();
        jobs.sort_by(|a, b| a.key.cmp(&b.key));
        jobs
    }

    /// Stop accepting runs, wait for queued and running ones and their cleanup, then flush pending events.
    pub async fn shutdown(&self) {
        self.engine.shutdown().await;
        self.events.close().await;
        info!(target: "jmaas.core.orchestrator", "orchestrator stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cleanup::ArtifactLayout,
        error::{JobFailure, RunnerError},
        runner::Runner,
        sink::{Capture, discard},
    };
    use async_trait::async_trait;
    use jmaas_model::JobStatus;
    use std::{
        sync::{
            Mutex,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    };
    use tokio::sync::{mpsc, oneshot};

    enum Step {
        Write(&'static [u8], oneshot::Sender<()>),
        Finish(Result<(), JobFailure>),
    }

    /// Test driver for the next run: the run writes and terminates only when told to.
    struct Feed(mpsc::UnboundedSender<Step>);

    impl Feed {
        async fn write(&self, bytes: &'static [u8]) {
            let (ack, done) = oneshot::channel();
            self.0.send(Step::Write(bytes, ack)).unwrap();
            done.await.unwrap();
        }

        fn finish(&self, result: Result<(), JobFailure>) {
            self.0.send(Step::Finish(result)).unwrap();
        }
    }

    #[derive(Default)]
    struct ScriptedRunner {
        builds: AtomicUsize,
        runs: Arc<AtomicUsize>,
        script: Arc<Mutex<Option<mpsc::UnboundedReceiver<Step>>>>,
    }

    impl ScriptedRunner {
        fn feed(&self) -> Feed {
            let (tx, rx) = mpsc::unbounded_channel();
            *self.script.lock().unwrap() = Some(rx);
            Feed(tx)
        }

        fn runs(&self) -> usize {
            self.runs.load(Ordering::SeqCst)
        }
    }

    impl Runner for ScriptedRunner {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn supports(&self, _config: &JobConfig) -> bool {
            true
        }

        fn build_unit(
            &self,
            _config: Arc<JobConfig>,
            sink: Arc<RedirectableSink>,
            _ctx: &BuildContext,
        ) -> Result<JobUnit, RunnerError> {
            self.builds.fetch_add(1, Ordering::SeqCst);
            let runs = Arc::clone(&self.runs);
            let script = Arc::clone(&self.script);
            Ok(Box::pin(async move {
                runs.fetch_add(1, Ordering::SeqCst);
                let Some(mut rx) = script.lock().unwrap().take() else {
                    return Ok(());
                };
                while let Some(step) = rx.recv().await {
                    match step {
                        Step::Write(bytes, ack) => {
                            sink.write(bytes);
                            let _ = ack.send(());
                        }
                        Step::Finish(result) => return result,
                    }
                }
                Ok(())
            }))
        }
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<JobEventKind>>);

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, event: &JobEvent) {
            self.0.lock().unwrap().push(event.kind);
        }
        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    struct Fixture {
        orch: Arc<Orchestrator>,
        runner: Arc<ScriptedRunner>,
        events: Arc<Recorder>,
        dir: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        fixture_with(2)
    }

    fn fixture_with(workers: usize) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::default());
        let events = Arc::new(Recorder::default());
        let config = OrchestratorConfig::default()
            .with_workers(workers)
            .with_instance_id("test-instance")
            .with_artifacts(ArtifactLayout::new(dir.path()));
        let orch = Orchestrator::new(
            config,
            RunnerRouter::new().with_runner(runner.clone()),
            vec![events.clone()],
        )
        .unwrap();
        Fixture {
            orch: Arc::new(orch),
            runner,
            events,
            dir,
        }
    }

    fn spec() -> JobSpec {
        JobSpec::new("example.com", "concurrency")
    }

    fn key(k: &str) -> JobKey {
        JobKey::from(k)
    }

    async fn eventually(cond: impl Fn() -> bool) {
        for _ in 0..400 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached in time");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_submits_share_one_run() {
        let fx = fixture();
        let feed = fx.runner.feed();

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let orch = Arc::clone(&fx.orch);
            tasks.push(tokio::spawn(async move {
                orch.submit("shared", spec(), discard()).unwrap()
            }));
        }
        let mut handles = Vec::new();
        for t in tasks {
            handles.push(t.await.unwrap());
        }

        let id = handles[0].id();
        assert!(handles.iter().all(|h| h.id() == id));

        feed.finish(Ok(()));
        for h in &handles {
            assert!(h.wait().await.is_ok());
        }
        assert_eq!(fx.runner.runs(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn resubmission_with_other_parameters_joins_the_first_run() {
        let fx = fixture();
        let feed = fx.runner.feed();

        let first = fx.orch.submit("t1", spec(), discard()).unwrap();
        let second = fx
            .orch
            .submit("t1", spec().with_concurrency(50).with_duration(600), discard())
            .unwrap();
        assert_eq!(first.id(), second.id());

        let record = fx.orch.lookup(&key("t1")).unwrap();
        assert_eq!(record.config().spec().concurrency, 1);
        assert_eq!(record.config().host(), "example.com");

        feed.finish(Ok(()));
        assert_eq!(first.wait().await, second.wait().await);
        assert_eq!(fx.runner.runs(), 1);
        assert_eq!(fx.runner.builds.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn attach_splits_output_and_primary_gets_everything() {
        let fx = fixture();
        let feed = fx.runner.feed();
        let primary = Capture::new();
        let a = Capture::new();
        let b = Capture::new();

        let handle = fx.orch.submit("t1", spec(), primary.destination()).unwrap();
        feed.write(b"pre;").await;

        assert!(fx.orch.attach(&key("t1"), a.destination()).is_some());
        feed.write(b"to-a;").await;
        assert!(fx.orch.attach(&key("t1"), b.destination()).is_some());
        feed.write(b"to-b;").await;

        feed.finish(Ok(()));
        assert!(handle.wait().await.is_ok());

        assert_eq!(a.to_string_lossy(), "to-a;");
        assert_eq!(b.to_string_lossy(), "to-b;");
        assert_eq!(primary.to_string_lossy(), "pre;to-a;to-b;");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn attach_works_until_completion_only() {
        let fx = fixture();
        let feed = fx.runner.feed();

        let handle = fx.orch.submit("t2", spec(), discard()).unwrap();
        let attached = fx.orch.attach(&key("t2"), discard()).unwrap();
        assert_eq!(attached.id(), handle.id());

        feed.finish(Ok(()));
        assert!(handle.wait().await.is_ok());

        let orch = Arc::clone(&fx.orch);
        eventually(move || orch.lookup(&key("t2")).is_none()).await;
        assert!(fx.orch.attach(&key("t2"), discard()).is_none());
        assert!(fx.orch.handle(&key("t2")).is_none());
    }

    #[tokio::test]
    async fn attach_to_unknown_key_has_no_effect() {
        let fx = fixture();
        let late = Capture::new();

        assert!(fx.orch.attach(&key("nope"), late.destination()).is_none());
        assert!(fx.orch.jobs().is_empty());

        fx.orch.shutdown().await;
        assert!(fx.events.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_submissions_register_nothing() {
        let fx = fixture();

        let cases = [
            ("t1", JobSpec::new("", "concurrency")),
            ("  ", spec()),
            ("t1", JobSpec::new("example.com", "soak")),
            ("t1", JobSpec::new("example.com", "qps")),
            ("t1", spec().with_latency(0, 10)),
            ("t1", spec().with_plan("/etc/passwd")),
            ("t1", spec().with_plan("../outside.jmx")),
        ];
        for (k, s) in cases {
            let err = fx.orch.submit(k, s, discard()).unwrap_err();
            assert!(matches!(err, CoreError::InvalidArgument(_)), "{err}");
        }

        assert!(fx.orch.jobs().is_empty());
        assert_eq!(fx.runner.builds.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_runner_is_an_invalid_argument() {
        let orch = Orchestrator::new(OrchestratorConfig::default(), RunnerRouter::new(), vec![])
            .unwrap();
        let err = orch.submit("t1", spec(), discard()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidArgument(_)));
        assert!(orch.lookup(&key("t1")).is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn failed_run_is_cleaned_up_and_keeps_its_failure() {
        let fx = fixture();
        let feed = fx.runner.feed();

        let handle = fx.orch.submit("t1", spec(), discard()).unwrap();
        let name = fx.orch.lookup(&key("t1")).unwrap().config().name().clone();
        let layout = ArtifactLayout::new(fx.dir.path());
        std::fs::write(layout.body_path(&name), b"{}").unwrap();

        feed.finish(Err(JobFailure::Execution("exit code: 1".into())));
        assert_eq!(
            handle.wait().await,
            Err(JobFailure::Execution("exit code: 1".into()))
        );

        fx.orch.shutdown().await;
        assert!(fx.orch.lookup(&key("t1")).is_none());
        assert!(!layout.body_path(&name).exists());
        assert_eq!(handle.status(), JobStatus::Failed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn undeletable_artifact_does_not_block_removal() {
        let fx = fixture();
        let feed = fx.runner.feed();

        let handle = fx.orch.submit("t1", spec(), discard()).unwrap();
        let name = fx.orch.lookup(&key("t1")).unwrap().config().name().clone();
        std::fs::create_dir(fx.dir.path().join(name.as_str())).unwrap();

        feed.finish(Ok(()));
        fx.orch.shutdown().await;

        assert!(handle.outcome().is_some_and(|o| o.is_ok()));
        assert!(fx.orch.lookup(&key("t1")).is_none());
        assert!(
            fx.events
                .0
                .lock()
                .unwrap()
                .contains(&JobEventKind::CleanupFailed)
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn key_can_be_reused_after_cleanup() {
        let fx = fixture();

        let first = fx.orch.submit("t1", spec(), discard()).unwrap();
        assert!(first.wait().await.is_ok());
        let orch = Arc::clone(&fx.orch);
        eventually(move || orch.lookup(&key("t1")).is_none()).await;

        let second = fx.orch.submit("t1", spec(), discard()).unwrap();
        assert_ne!(first.id(), second.id());
        assert!(second.wait().await.is_ok());
        assert_eq!(fx.runner.runs(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn jobs_lists_registered_runs() {
        let fx = fixture_with(1);
        let feed = fx.runner.feed();

        let running = fx.orch.submit("b", spec(), discard()).unwrap();
        let h = running.clone();
        eventually(move || h.status() == JobStatus::Running).await;
        let queued = fx.orch.submit("a", spec(), discard()).unwrap();

        let jobs = fx.orch.jobs();
        let keys: Vec<&str> = jobs.iter().map(|j| j.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(jobs[0].status, JobStatus::Queued);
        assert_eq!(jobs[0].id, queued.id());
        assert_eq!(jobs[1].status, JobStatus::Running);
        assert_eq!(jobs[1].id, running.id());

        feed.finish(Ok(()));
        fx.orch.shutdown().await;
        assert!(fx.orch.jobs().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn lifecycle_events_are_published_in_order() {
        let fx = fixture();
        let feed = fx.runner.feed();

        let handle = fx.orch.submit("t1", spec(), discard()).unwrap();
        fx.orch.submit("t1", spec(), discard()).unwrap();
        fx.orch.attach(&key("t1"), discard()).unwrap();
        feed.finish(Ok(()));
        assert!(handle.wait().await.is_ok());
        fx.orch.shutdown().await;

        let kinds = fx.events.0.lock().unwrap().clone();
        let pos = |k: JobEventKind| kinds.iter().position(|e| *e == k).unwrap();
        assert!(pos(JobEventKind::Submitted) < pos(JobEventKind::Started));
        assert!(pos(JobEventKind::Started) < pos(JobEventKind::Succeeded));
        assert!(pos(JobEventKind::Succeeded) < pos(JobEventKind::Cleaned));
        assert!(kinds.contains(&JobEventKind::Deduplicated));
        assert!(kinds.contains(&JobEventKind::Attached));
    }

    #[tokio::test]
    async fn submit_after_shutdown_fails_and_cleans_up() {
        let fx = fixture();
        fx.orch.shutdown().await;

        let handle = fx.orch.submit("late", spec(), discard()).unwrap();
        assert_eq!(handle.wait().await, Err(JobFailure::EngineClosed));
        let orch = Arc::clone(&fx.orch);
        eventually(move || orch.lookup(&key("late")).is_none()).await;
        assert_eq!(fx.runner.runs(), 0);
    }
}
