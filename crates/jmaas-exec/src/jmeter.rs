use std::path::PathBuf;

use jmaas_core::ArtifactLayout;
use jmaas_model::{JobConfig, Metadata};

use crate::{
    error::{ExecError, ExecResult},
    provider::{CommandSpec, ProcessProvider, StagedFile},
};

/// Non-GUI JMeter run of the job's test plan.
///
/// Samples go to standard output (and so to the job sink); the JMeter log goes to `<artifacts>/<name>`. Every job
/// field is passed as a `-J` property readable from the plan with `${__P(name)}`.
#[derive(Debug, Clone)]
pub struct JMeterProvider {
    program: String,
    plans_dir: PathBuf,
}

impl Default for JMeterProvider {
    fn default() -> Self {
        Self {
            program: "jmeter".to_string(),
            plans_dir: PathBuf::from("/"),
        }
    }
}

impl JMeterProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Directory test plans are resolved against.
    pub fn with_plans_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.plans_dir = dir.into();
        self
    }

    fn properties(&self, config: &JobConfig, layout: &ArtifactLayout) -> Vec<(&'static str, String)> {
        let spec = config.spec();
        let mut props = vec![
            ("id", config.key().to_string()),
            ("name", config.name().to_string()),
            ("instance", config.instance_id().to_string()),
            ("mode", config.mode().to_string()),
            ("host", spec.host.trim().to_string()),
            ("path", spec.path.clone().unwrap_or_else(|| "/".to_string())),
            ("concurrency", spec.concurrency.to_string()),
            ("duration", spec.duration.to_string()),
            ("rampup_time", spec.rampup_time.to_string()),
            ("rampup_steps", spec.rampup_steps.to_string()),
            ("min_latency", spec.min_latency_ms.to_string()),
            ("max_latency", spec.max_latency_ms.to_string()),
        ];

        let optional = [
            ("proto", spec.proto.clone()),
            ("method", spec.method.clone()),
            ("port", spec.port.map(|p| p.to_string())),
            ("threads", spec.threads.clone()),
            ("profile", spec.profile.clone()),
            ("trace_id", spec.trace_id.clone()),
            ("query", join(&spec.query, "=", "&")),
            ("headers", join(&spec.headers, ":", "|")),
            (
                "body_file",
                spec.body
                    .as_ref()
                    .map(|_| layout.body_path(config.name()).display().to_string()),
            ),
        ];
        props.extend(optional.into_iter().filter_map(|(k, v)| v.map(|v| (k, v))));
        props
    }
}

fn join(map: &Metadata, kv: &str, sep: &str) -> Option<String> {
    if map.is_empty() {
        return None;
    }
    Some(
        map.iter()
            .map(|(k, v)| format!("{k}{kv}{v}"))
            .collect::<Vec<_>>()
            .join(sep),
    )
}

impl ProcessProvider for JMeterProvider {
    fn name(&self) -> &'static str {
        "jmeter"
    }

    fn command(&self, config: &JobConfig, layout: &ArtifactLayout) -> ExecResult<CommandSpec> {
        if self.program.trim().is_empty() {
            return Err(ExecError::MissingProgram);
        }

        let plan = self.plans_dir.join(config.plan());
        let log = layout.log_path(config.name());

        let cmd = CommandSpec::new(self.program.clone())
            .args(["-n", "-t"])
            .arg(plan.display().to_string())
            .args(["-l", "/dev/stdout", "-j"])
            .arg(log.display().to_string())
            .args(
                self.properties(config, layout)
                    .into_iter()
                    .map(|(k, v)| format!("-J{k}={v}")),
            );
        Ok(cmd)
    }

    fn staged(&self, config: &JobConfig, layout: &ArtifactLayout) -> Vec<StagedFile> {
        match &config.spec().body {
            Some(body) => vec![StagedFile {
                path: layout.body_path(config.name()),
                contents: body.as_bytes().to_vec(),
            }],
            None => Vec::new(),
        }
    }
}
