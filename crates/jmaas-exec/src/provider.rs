use std::path::PathBuf;

use jmaas_core::ArtifactLayout;
use jmaas_model::JobConfig;

use crate::error::ExecResult;

/// Fully resolved process invocation.
#[derive(Clone, Debug)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub cwd: Option<PathBuf>,
    /// Treat a non-zero exit code as a failed run.
    pub fail_on_non_zero: bool,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            cwd: None,
            fail_on_non_zero: true,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_fail_on_non_zero(mut self, fail: bool) -> Self {
        self.fail_on_non_zero = fail;
        self
    }
}

/// File written before the process starts and removed by cleanup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StagedFile {
    pub path: PathBuf,
    pub contents: Vec<u8>,
}

/// Describes the external process behind a job.
///
/// Everything is derived from the immutable job config, so a provider is consulted once at submission.
pub trait ProcessProvider: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    fn supports(&self, _config: &JobConfig) -> bool {
        true
    }

    fn command(&self, config: &JobConfig, layout: &ArtifactLayout) -> ExecResult<CommandSpec>;

    /// Bytes piped to the process standard input, if any.
    fn input(&self, _config: &JobConfig) -> Option<Vec<u8>> {
        None
    }

    /// Files to write under the artifact layout before starting.
    fn staged(&self, _config: &JobConfig, _layout: &ArtifactLayout) -> Vec<StagedFile> {
        Vec::new()
    }
}
