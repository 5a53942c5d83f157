use std::{
    path::{Component, Path},
    time::SystemTime,
};

use crate::{JobKey, JobName, JobSpec, SpecError};

/// Immutable description of one admitted run.
///
/// Built once at submission from a validated [`JobSpec`]; there are no setters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobConfig {
    key: JobKey,
    name: JobName,
    instance_id: String,
    plan: String,
    mode: String,
    submitted_at: SystemTime,
    spec: JobSpec,
}

impl JobConfig {
    /// Validate `spec` and freeze it together with the identity of the run.
    ///
    /// `default_plan` is used when the spec does not name a test plan.
    pub fn new(
        key: JobKey,
        instance_id: impl Into<String>,
        default_plan: &str,
        spec: JobSpec,
        submitted_at: SystemTime,
    ) -> Result<Self, SpecError> {
        if key.is_blank() {
            return Err(SpecError::Missing("key"));
        }
        spec.validate()?;

        let instance_id = instance_id.into();
        let plan = spec
            .plan
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(default_plan)
            .to_string();
        if plan.is_empty() {
            return Err(SpecError::Missing("plan"));
        }
        if !Path::new(&plan)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(SpecError::InvalidPlan(plan));
        }
        let name = JobName::derive(&instance_id, &key, &plan, submitted_at);
        let mode = spec.normalized_mode();

        Ok(Self {
            key,
            name,
            instance_id,
            plan,
            mode,
            submitted_at,
            spec,
        })
    }

    #[inline]
    pub fn key(&self) -> &JobKey {
        &self.key
    }

    #[inline]
    pub fn name(&self) -> &JobName {
        &self.name
    }

    #[inline]
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Resolved test plan file name.
    #[inline]
    pub fn plan(&self) -> &str {
        &self.plan
    }

    /// Normalized (lower-case) mode.
    #[inline]
    pub fn mode(&self) -> &str {
        &self.mode
    }

    #[inline]
    pub fn host(&self) -> &str {
        &self.spec.host
    }

    #[inline]
    pub fn submitted_at(&self) -> SystemTime {
        self.submitted_at
    }

    #[inline]
    pub fn spec(&self) -> &JobSpec {
        &self.spec
    }
}
