use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::{JobConfig, JobId, JobKey, JobName, JobStatus};

/// Point-in-time snapshot of a registered job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobInfo {
    pub key: JobKey,
    pub id: JobId,
    pub name: JobName,
    pub mode: String,
    pub host: String,
    pub status: JobStatus,
    #[serde(with = "time_serde")]
    pub submitted_at: SystemTime,
    /// Failure reason when `status` is `Failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobInfo {
    pub fn new(id: JobId, config: &JobConfig, status: JobStatus, error: Option<String>) -> Self {
        Self {
            key: config.key().clone(),
            id,
            name: config.name().clone(),
            mode: config.mode().to_string(),
            host: config.host().to_string(),
            status,
            submitted_at: config.submitted_at(),
            error,
        }
    }
}

mod time_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::{SystemTime, UNIX_EPOCH};

    pub fn serialize<S>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let since_epoch = time
            .duration_since(UNIX_EPOCH)
            .map_err(serde::ser::Error::custom)?;
        since_epoch.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SystemTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(UNIX_EPOCH + std::time::Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::JobSpec;
    use std::time::Duration;

    fn config() -> JobConfig {
        JobConfig::new(
            JobKey::from("t1"),
            "inst",
            "test.jmx",
            JobSpec::new("example.com", "concurrency"),
            SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000),
        )
        .unwrap()
    }

    #[test]
    fn snapshot_copies_config_fields() {
        let info = JobInfo::new(JobId::new(), &config(), JobStatus::Running, None);
        assert_eq!(info.key.as_str(), "t1");
        assert_eq!(info.host, "example.com");
        assert_eq!(info.mode, "concurrency");
        assert_eq!(info.status, JobStatus::Running);
    }

    #[test]
    fn submitted_at_is_unix_seconds_and_error_is_optional() {
        let info = JobInfo::new(JobId::new(), &config(), JobStatus::Succeeded, None);
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["submittedAt"], 1_700_000_000u64);
        assert!(json.get("error").is_none());
    }
}
