use serde::{Deserialize, Serialize};

/// Execution state of a job run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JobStatus {
    /// Accepted and waiting for a free worker.
    Queued,
    /// The external unit is executing.
    Running,
    /// The unit terminated normally.
    Succeeded,
    /// The unit terminated abnormally or never ran.
    Failed,
}

impl JobStatus {
    /// Returns `true` once the run reached its terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }

    /// Returns `true` while the run is queued or executing.
    pub fn is_active(&self) -> bool {
        matches!(self, JobStatus::Queued | JobStatus::Running)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(JobStatus::Succeeded.is_terminal());
        assert!(JobStatus::Failed.is_terminal());

        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
    }

    #[test]
    fn active_states() {
        assert!(JobStatus::Queued.is_active());
        assert!(JobStatus::Running.is_active());

        assert!(!JobStatus::Succeeded.is_active());
        assert!(!JobStatus::Failed.is_active());
    }

    #[test]
    fn serializes_camel_case() {
        assert_eq!(
            serde_json::to_string(&JobStatus::Succeeded).unwrap(),
            r#""succeeded""#
        );
    }
}
