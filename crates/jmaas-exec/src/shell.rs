use jmaas_core::ArtifactLayout;
use jmaas_model::JobConfig;

use crate::{
    error::{ExecError, ExecResult},
    provider::{CommandSpec, ProcessProvider},
};

/// Runs a fixed script through the platform shell (`sh -c` / `cmd /C`) for every job.
///
/// Job fields are exported as `JMAAS_*` environment variables.
#[derive(Debug, Clone)]
pub struct ShellProvider {
    script: String,
    input: Option<Vec<u8>>,
    fail_on_non_zero: bool,
}

impl ShellProvider {
    pub fn new(script: impl Into<String>) -> Self {
        Self {
            script: script.into(),
            input: None,
            fail_on_non_zero: true,
        }
    }

    pub fn with_input(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.input = Some(input.into());
        self
    }

    pub fn with_fail_on_non_zero(mut self, fail: bool) -> Self {
        self.fail_on_non_zero = fail;
        self
    }
}

impl ProcessProvider for ShellProvider {
    fn name(&self) -> &'static str {
        "shell"
    }

    fn command(&self, config: &JobConfig, layout: &ArtifactLayout) -> ExecResult<CommandSpec> {
        if self.script.trim().is_empty() {
            return Err(ExecError::MissingProgram);
        }

        cfg_if::cfg_if! {
            if #[cfg(target_family = "windows")] {
                let cmd = CommandSpec::new("cmd").args(["/C", self.script.as_str()]);
            } else {
                let cmd = CommandSpec::new("sh").args(["-c", self.script.as_str()]);
            }
        }

        Ok(cmd
            .env("JMAAS_KEY", config.key().as_str())
            .env("JMAAS_NAME", config.name().as_str())
            .env("JMAAS_HOST", config.host())
            .env("JMAAS_MODE", config.mode())
            .env("JMAAS_LOG", layout.log_path(config.name()).display().to_string())
            .with_fail_on_non_zero(self.fail_on_non_zero))
    }

    fn input(&self, _config: &JobConfig) -> Option<Vec<u8>> {
        self.input.clone()
    }
}
