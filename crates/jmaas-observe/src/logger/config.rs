use std::{io::IsTerminal, str::FromStr};

use crate::logger::{error::LoggerError, format::LoggerFormat};

pub const LOG_FORMAT_ENV: &str = "JMAAS_LOG_FORMAT";
pub const LOG_LEVEL_ENV: &str = "JMAAS_LOG_LEVEL";
pub const LOG_TARGET_ENV: &str = "JMAAS_LOG_TARGET";

/// Stream the text and json formats write to.
///
/// Defaults to stderr: stdout carries job samples when a run is attached to the console.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogTarget {
    Stdout,
    #[default]
    Stderr,
}

impl LogTarget {
    fn is_terminal(&self) -> bool {
        match self {
            LogTarget::Stdout => std::io::stdout().is_terminal(),
            LogTarget::Stderr => std::io::stderr().is_terminal(),
        }
    }
}

impl FromStr for LogTarget {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stdout" => Ok(LogTarget::Stdout),
            "stderr" => Ok(LogTarget::Stderr),
            _ => Err(LoggerError::InvalidTarget(s.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub format: LoggerFormat,
    /// `EnvFilter` directives, e.g. `info` or `info,jmaas.exec=debug`.
    pub level: String,
    pub target: LogTarget,
    pub with_targets: bool,
    pub use_color: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        let target = LogTarget::default();
        Self {
            format: LoggerFormat::Text,
            level: "info".to_string(),
            use_color: cfg!(test) || target.is_terminal(),
            target,
            with_targets: true,
        }
    }
}

impl LoggerConfig {
    /// Defaults overridden by `JMAAS_LOG_FORMAT`, `JMAAS_LOG_LEVEL` and `JMAAS_LOG_TARGET`.
    pub fn from_env() -> Result<Self, LoggerError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, LoggerError> {
        let mut cfg = Self::default();
        if let Some(format) = get(LOG_FORMAT_ENV).filter(|v| !v.trim().is_empty()) {
            cfg.format = format.parse()?;
        }
        if let Some(level) = get(LOG_LEVEL_ENV).filter(|v| !v.trim().is_empty()) {
            cfg.level = level.trim().to_string();
        }
        if let Some(target) = get(LOG_TARGET_ENV).filter(|v| !v.trim().is_empty()) {
            cfg.target = target.parse()?;
            cfg.use_color = cfg.target.is_terminal();
        }
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_overrides_format_and_level() {
        let cfg = LoggerConfig::from_lookup(|name| match name {
            LOG_FORMAT_ENV => Some("json".into()),
            LOG_LEVEL_ENV => Some(" debug ".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(cfg.format, LoggerFormat::Json);
        assert_eq!(cfg.level, "debug");
    }

    #[test]
    fn blank_values_keep_defaults() {
        let cfg = LoggerConfig::from_lookup(|_| Some(String::new())).unwrap();
        assert_eq!(cfg.format, LoggerFormat::Text);
        assert_eq!(cfg.level, "info");
        assert_eq!(cfg.target, LogTarget::Stderr);
    }

    #[test]
    fn target_can_be_switched_to_stdout() {
        let cfg = LoggerConfig::from_lookup(|name| (name == LOG_TARGET_ENV).then(|| " STDOUT".into())).unwrap();
        assert_eq!(cfg.target, LogTarget::Stdout);

        let res = LoggerConfig::from_lookup(|name| (name == LOG_TARGET_ENV).then(|| "file".into()));
        assert!(matches!(res, Err(LoggerError::InvalidTarget(_))));
    }

    #[test]
    fn bad_format_is_an_error() {
        let res = LoggerConfig::from_lookup(|name| (name == LOG_FORMAT_ENV).then(|| "yaml".into()));
        assert!(matches!(res, Err(LoggerError::InvalidFormat(_))));
    }
}
