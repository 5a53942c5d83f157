use async_trait::async_trait;
use jmaas_core::{JobEvent, JobEventKind, Subscribe};
use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    proto::MetricFamily,
};

const DURATION_BUCKETS: &[f64] = &[1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0, 3600.0];

/// Job metrics fed by lifecycle events. Clones share the same collectors.
#[derive(Clone)]
pub struct PrometheusMetrics {
    registry: Registry,
    submitted: IntCounter,
    deduplicated: IntCounter,
    attached: IntCounter,
    completed: IntCounterVec,
    cleanup_failures: IntCounter,
    duration: Histogram,
    registered: IntGauge,
    started: IntCounter,
}

impl PrometheusMetrics {
    /// Metrics registered in a fresh registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        Self::with_registry(Registry::new())
    }

    /// Metrics registered in `registry`, e.g. one shared with other collectors.
    pub fn with_registry(registry: Registry) -> Result<Self, prometheus::Error> {
        let submitted = IntCounter::new("jmaas_jobs_submitted_total", "Jobs admitted for execution")?;
        let deduplicated = IntCounter::new(
            "jmaas_jobs_deduplicated_total",
            "Submissions that joined a job already in flight",
        )?;
        let attached = IntCounter::new("jmaas_output_attached_total", "Output re-attachments")?;
        let completed = IntCounterVec::new(
            Opts::new("jmaas_jobs_completed_total", "Jobs that reached a terminal state"),
            &["outcome"],
        )?;
        let cleanup_failures = IntCounter::new(
            "jmaas_cleanup_failures_total",
            "Best-effort cleanup steps that failed",
        )?;
        let duration = Histogram::with_opts(
            HistogramOpts::new("jmaas_job_duration_seconds", "Wall time of successful jobs")
                .buckets(DURATION_BUCKETS.to_vec()),
        )?;
        let registered = IntGauge::new("jmaas_jobs_registered", "Jobs currently registered")?;
        let started = IntCounter::new("jmaas_jobs_started_total", "Jobs picked up by a worker")?;

        registry.register(Box::new(submitted.clone()))?;
        registry.register(Box::new(deduplicated.clone()))?;
        registry.register(Box::new(attached.clone()))?;
        registry.register(Box::new(completed.clone()))?;
        registry.register(Box::new(cleanup_failures.clone()))?;
        registry.register(Box::new(duration.clone()))?;
        registry.register(Box::new(registered.clone()))?;
        registry.register(Box::new(started.clone()))?;

        Ok(Self {
            registry,
            submitted,
            deduplicated,
            attached,
            completed,
            cleanup_failures,
            duration,
            registered,
            started,
        })
    }

    #[inline]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    pub fn record(&self, event: &JobEvent) {
        match event.kind {
            JobEventKind::Submitted => {
                self.submitted.inc();
                self.registered.inc();
            }
            JobEventKind::Deduplicated => self.deduplicated.inc(),
            JobEventKind::Attached => self.attached.inc(),
            JobEventKind::Started => self.started.inc(),
            JobEventKind::Succeeded => {
                self.completed.with_label_values(&["succeeded"]).inc();
                if let Some(elapsed) = event.elapsed {
                    self.duration.observe(elapsed.as_secs_f64());
                }
            }
            JobEventKind::Failed => self.completed.with_label_values(&["failed"]).inc(),
            JobEventKind::CleanupFailed => self.cleanup_failures.inc(),
            JobEventKind::Cleaned => self.registered.dec(),
        }
    }
}

#[async_trait]
impl Subscribe for PrometheusMetrics {
    async fn on_event(&self, event: &JobEvent) {
        self.record(event);
    }
    fn name(&self) -> &'static str {
        "prometheus"
    }
}
