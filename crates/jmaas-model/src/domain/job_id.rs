use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of one execution.
///
/// Unlike [`crate::JobKey`], a new id is minted for every admitted run, so an entry left behind by a finished run can never be confused with a later run reusing the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
