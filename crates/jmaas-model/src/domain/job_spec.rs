use serde::{Deserialize, Serialize};

use crate::{LatencyMs, Metadata, SpecError};

/// Load driven as a fixed number of concurrent threads.
pub const MODE_CONCURRENCY: &str = "concurrency";
/// Load driven as a requests-per-second profile.
pub const MODE_QPS: &str = "qps";

const DEFAULT_MIN_LATENCY_MS: LatencyMs = 1;
const DEFAULT_MAX_LATENCY_MS: LatencyMs = 1000;

/// Caller-facing description of a load test against a remote HTTP service.
///
/// This is what a front end parses out of a request. The orchestrator turns it into an immutable [`crate::JobConfig`] at submission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobSpec {
    /// Test plan file name; `None` selects the configured default plan.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
    /// Operation mode: `concurrency` or `qps` (case-insensitive).
    pub mode: String,
    /// `http` or `https`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proto: Option<String>,
    /// HTTP method used by the test plan.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// FQDN, host name or IP of the remote service.
    pub host: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// URL path of the remote endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Metadata::is_empty")]
    pub query: Metadata,
    #[serde(skip_serializing_if = "Metadata::is_empty")]
    pub headers: Metadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Thread step profile used in `concurrency` mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads: Option<String>,
    /// Throughput profile; required in `qps` mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    pub concurrency: u32,
    pub duration: u32,
    pub rampup_time: u32,
    pub rampup_steps: u32,
    pub min_latency_ms: LatencyMs,
    pub max_latency_ms: LatencyMs,
}

impl Default for JobSpec {
    fn default() -> Self {
        Self {
            plan: None,
            mode: MODE_CONCURRENCY.to_string(),
            proto: None,
            method: None,
            host: String::new(),
            port: None,
            path: None,
            query: Metadata::new(),
            headers: Metadata::new(),
            body: None,
            threads: None,
            profile: None,
            trace_id: None,
            concurrency: 1,
            duration: 1,
            rampup_time: 1,
            rampup_steps: 1,
            min_latency_ms: DEFAULT_MIN_LATENCY_MS,
            max_latency_ms: DEFAULT_MAX_LATENCY_MS,
        }
    }
}

impl JobSpec {
    pub fn new(host: impl Into<String>, mode: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            mode: mode.into(),
            ..Self::default()
        }
    }

    pub fn with_plan(mut self, plan: impl Into<String>) -> Self {
        self.plan = Some(plan.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    pub fn with_concurrency(mut self, concurrency: u32) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_duration(mut self, duration: u32) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_latency(mut self, min_ms: LatencyMs, max_ms: LatencyMs) -> Self {
        self.min_latency_ms = min_ms;
        self.max_latency_ms = max_ms;
        self
    }

    /// Mode trimmed and lower-cased.
    pub fn normalized_mode(&self) -> String {
        self.mode.trim().to_ascii_lowercase()
    }

    /// Check the fields every job needs before anything is registered.
    pub fn validate(&self) -> Result<(), SpecError> {
        if self.host.trim().is_empty() {
            return Err(SpecError::Missing("host"));
        }
        let mode = self.normalized_mode();
        if mode.is_empty() {
            return Err(SpecError::Missing("mode"));
        }
        if mode == MODE_QPS && self.profile.as_deref().is_none_or(|p| p.trim().is_empty()) {
            return Err(SpecError::MissingProfile);
        }
        if self.min_latency_ms == 0 {
            return Err(SpecError::MinLatency);
        }
        if self.max_latency_ms < self.min_latency_ms {
            return Err(SpecError::MaxLatency {
                min: self.min_latency_ms,
                max: self.max_latency_ms,
            });
        }
        Ok(())
    }
}
