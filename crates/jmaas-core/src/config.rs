use std::{path::PathBuf, str::FromStr};

use jmaas_model::{MODE_CONCURRENCY, MODE_QPS};

use crate::{cleanup::ArtifactLayout, error::CoreError, system};

pub const WORKERS_ENV: &str = "JMAAS_WORKERS";
pub const MODES_ENV: &str = "JMAAS_MODES";
pub const TEST_PLAN_ENV: &str = "JMAAS_TEST_PLAN";
pub const ARTIFACT_DIR_ENV: &str = "JMAAS_ARTIFACT_DIR";

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Size of the worker pool; submissions beyond it queue.
    pub workers: usize,
    /// Accepted modes, lower-case.
    pub modes: Vec<String>,
    /// Test plan used when a job does not name one.
    pub default_plan: String,
    pub instance_id: String,
    pub artifacts: ArtifactLayout,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            workers: 3,
            modes: vec![MODE_CONCURRENCY.to_string(), MODE_QPS.to_string()],
            default_plan: "test.jmx".to_string(),
            instance_id: system::instance_id().to_string(),
            artifacts: ArtifactLayout::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Defaults overridden by `JMAAS_*` environment variables.
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, CoreError> {
        let mut cfg = Self::default();
        let get = |name: &str| get(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get(WORKERS_ENV) {
            cfg.workers = parse::<usize>(WORKERS_ENV, &v)?;
        }
        if let Some(v) = get(MODES_ENV) {
            cfg.modes = v
                .split(',')
                .map(|m| m.trim().to_ascii_lowercase())
                .filter(|m| !m.is_empty())
                .collect();
        }
        if let Some(v) = get(TEST_PLAN_ENV) {
            cfg.default_plan = v;
        }
        if let Some(v) = get(ARTIFACT_DIR_ENV) {
            cfg.artifacts = ArtifactLayout::new(PathBuf::from(v));
        }
        if let Some(v) = get(system::INSTANCE_ID_ENV) {
            cfg.instance_id = v;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    #[inline]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    #[inline]
    pub fn with_modes<I, S>(mut self, modes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.modes = modes.into_iter().map(|m| m.into().to_ascii_lowercase()).collect();
        self
    }

    #[inline]
    pub fn with_artifacts(mut self, artifacts: ArtifactLayout) -> Self {
        self.artifacts = artifacts;
        self
    }

    #[inline]
    pub fn with_instance_id(mut self, id: impl Into<String>) -> Self {
        self.instance_id = id.into();
        self
    }

    pub fn supports_mode(&self, mode: &str) -> bool {
        self.modes.iter().any(|m| m == mode)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.workers == 0 {
            return Err(CoreError::Config("workers must be at least 1".into()));
        }
        if self.modes.is_empty() {
            return Err(CoreError::Config("at least one mode is required".into()));
        }
        if self.default_plan.trim().is_empty() {
            return Err(CoreError::Config("default test plan is empty".into()));
        }
        Ok(())
    }
}

fn parse<T: FromStr>(name: &str, value: &str) -> Result<T, CoreError> {
    value
        .parse()
        .map_err(|_| CoreError::Config(format!("{name}: cannot parse '{value}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_without_env() {
        let cfg = OrchestratorConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.workers, 3);
        assert_eq!(cfg.modes, vec!["concurrency", "qps"]);
        assert_eq!(cfg.default_plan, "test.jmx");
        assert!(!cfg.instance_id.is_empty());
    }

    #[test]
    fn env_overrides_defaults() {
        let cfg = OrchestratorConfig::from_lookup(lookup(&[
            (WORKERS_ENV, "8"),
            (MODES_ENV, " QPS , "),
            (TEST_PLAN_ENV, "smoke.jmx"),
            (ARTIFACT_DIR_ENV, "/var/tmp/jmaas"),
            (system::INSTANCE_ID_ENV, "agent-7"),
        ]))
        .unwrap();
        assert_eq!(cfg.workers, 8);
        assert_eq!(cfg.modes, vec!["qps"]);
        assert_eq!(cfg.default_plan, "smoke.jmx");
        assert_eq!(cfg.artifacts.dir(), std::path::Path::new("/var/tmp/jmaas"));
        assert_eq!(cfg.instance_id, "agent-7");
        assert!(cfg.supports_mode("qps"));
        assert!(!cfg.supports_mode("concurrency"));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            OrchestratorConfig::from_lookup(lookup(&[(WORKERS_ENV, "many")])),
            Err(CoreError::Config(_))
        ));
        assert!(matches!(
            OrchestratorConfig::from_lookup(lookup(&[(WORKERS_ENV, "0")])),
            Err(CoreError::Config(_))
        ));
        assert!(matches!(
            OrchestratorConfig::from_lookup(lookup(&[(MODES_ENV, ",")])),
            Err(CoreError::Config(_))
        ));
    }
}
