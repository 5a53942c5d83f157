use std::{fmt, time::Duration};

use jmaas_model::{JobId, JobKey, JobStatus};
use tokio::sync::watch;

use crate::error::JobFailure;

/// Successful termination of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    /// Wall time between the unit starting and terminating.
    pub elapsed: Duration,
}

/// Terminal result of a run, set exactly once.
pub type JobOutcome = Result<Completion, JobFailure>;

/// Lifecycle of a run as observed through its handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Queued,
    Running,
    Finished(JobOutcome),
}

impl JobState {
    pub fn status(&self) -> JobStatus {
        match self {
            JobState::Queued => JobStatus::Queued,
            JobState::Running => JobStatus::Running,
            JobState::Finished(Ok(_)) => JobStatus::Succeeded,
            JobState::Finished(Err(_)) => JobStatus::Failed,
        }
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        matches!(self, JobState::Finished(_))
    }
}

/// Caller view of a run.
///
/// Handles are cheap to clone and fully independent: dropping or abandoning one never affects the run or any other
/// caller awaiting it. There is deliberately no way to cancel the run through a handle.
#[derive(Clone)]
pub struct JobHandle {
    key: JobKey,
    id: JobId,
    state: watch::Receiver<JobState>,
}

impl JobHandle {
    /// Create a queued handle together with the completer that drives it.
    pub fn channel(key: JobKey, id: JobId) -> (Completer, JobHandle) {
        let (tx, rx) = watch::channel(JobState::Queued);
        let completer = Completer {
            key: key.clone(),
            id,
            state: tx,
        };
        (completer, JobHandle { key, id, state: rx })
    }

    #[inline]
    pub fn key(&self) -> &JobKey {
        &self.key
    }

    #[inline]
    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn status(&self) -> JobStatus {
        self.state.borrow().status()
    }

    pub fn is_finished(&self) -> bool {
        self.state.borrow().is_finished()
    }

    /// Terminal result if already available; never waits.
    pub fn outcome(&self) -> Option<JobOutcome> {
        match &*self.state.borrow() {
            JobState::Finished(outcome) => Some(outcome.clone()),
            _ => None,
        }
    }

    /// Wait for the terminal result.
    ///
    /// Resolves to [`JobFailure::Abandoned`] if the completer went away without reporting.
    pub async fn wait(&self) -> JobOutcome {
        if let Some(outcome) = self.outcome() {
            return outcome;
        }

        let mut rx = self.state.clone();
        if let Ok(state) = rx.wait_for(JobState::is_finished).await
            && let JobState::Finished(outcome) = &*state
        {
            return outcome.clone();
        }

        self.outcome().unwrap_or(Err(JobFailure::Abandoned))
    }
}

impl fmt::Debug for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobHandle")
            .field("key", &self.key)
            .field("id", &self.id)
            .field("status", &self.status())
            .finish()
    }
}

/// Producer side of a [`JobHandle`]; owned by whoever executes the run.
pub struct Completer {
    key: JobKey,
    id: JobId,
    state: watch::Sender<JobState>,
}

impl Completer {
    #[inline]
    pub fn key(&self) -> &JobKey {
        &self.key
    }

    #[inline]
    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn running(&self) {
        self.state.send_if_modified(|state| {
            if matches!(state, JobState::Queued) {
                *state = JobState::Running;
                true
            } else {
                false
            }
        });
    }

    /// Publish the terminal result; consumes the completer so it can only happen once.
    pub fn finish(self, outcome: JobOutcome) {
        self.state.send_replace(JobState::Finished(outcome));
    }
}

impl fmt::Debug for Completer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completer")
            .field("key", &self.key)
            .field("id", &self.id)
            .finish()
    }
}
