use std::{
    fmt,
    time::{SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::JobKey;

const NAME_LEN: usize = 16;

/// Content-derived name of a job run, used to name its transient artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobName(String);

impl JobName {
    /// Derive the name from the inputs identifying a run.
    ///
    /// The submission instant is part of the digest, so resubmitting the same key later yields a different name.
    pub fn derive(instance_id: &str, key: &JobKey, plan: &str, submitted_at: SystemTime) -> Self {
        let millis = submitted_at
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();

        let mut hasher = Sha256::new();
        hasher.update(instance_id.as_bytes());
        hasher.update([0u8]);
        hasher.update(key.as_str().as_bytes());
        hasher.update([0u8]);
        hasher.update(plan.as_bytes());
        hasher.update(millis.to_be_bytes());

        let mut digest = hex::encode(hasher.finalize());
        digest.truncate(NAME_LEN);
        Self(digest)
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
