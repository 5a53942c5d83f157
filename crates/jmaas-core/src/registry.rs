use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};
use jmaas_model::{JobConfig, JobId, JobInfo, JobKey, JobStatus};

use crate::{
    handle::{Completer, JobHandle},
    sink::RedirectableSink,
};

/// Registry view of an admitted run.
#[derive(Debug, Clone)]
pub struct JobRecord {
    id: JobId,
    config: Arc<JobConfig>,
    handle: JobHandle,
}

impl JobRecord {
    #[inline]
    pub fn id(&self) -> JobId {
        self.id
    }

    #[inline]
    pub fn key(&self) -> &JobKey {
        self.config.key()
    }

    #[inline]
    pub fn config(&self) -> &Arc<JobConfig> {
        &self.config
    }

    #[inline]
    pub fn handle(&self) -> &JobHandle {
        &self.handle
    }

    pub fn status(&self) -> JobStatus {
        self.handle.status()
    }

    /// Snapshot suitable for listing.
    pub fn info(&self) -> JobInfo {
        let error = match self.handle.outcome() {
            Some(Err(failure)) => Some(failure.to_string()),
            _ => None,
        };
        JobInfo::new(self.id, &self.config, self.handle.status(), error)
    }
}

/// Result of [`JobRegistry::admit`].
pub enum Admission {
    /// No run was in flight: the new run is registered and its completer must be dispatched.
    Fresh {
        handle: JobHandle,
        completer: Completer,
    },
    /// A run for the key is already registered; nothing was changed.
    Joined(JobHandle),
}

struct SinkEntry {
    id: JobId,
    sink: Arc<RedirectableSink>,
}

/// Keyed tables of admitted runs.
///
/// Three tables (key → handle, key → record, key → sink) are kept consistent:
/// - a run is admitted by an atomic insert-if-absent on the handle table, and its record and sink are inserted while
///   that entry is still held;
/// - removals match on the run id, so a late cleanup of an old run never removes a newer run under the same key.
#[derive(Default)]
pub struct JobRegistry {
    handles: DashMap<JobKey, JobHandle>,
    records: DashMap<JobKey, JobRecord>,
    sinks: DashMap<JobKey, SinkEntry>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a run for `config.key()` unless one is already registered.
    ///
    /// On [`Admission::Joined`] the passed sink is dropped unused.
    pub fn admit(&self, config: Arc<JobConfig>, sink: Arc<RedirectableSink>) -> Admission {
        let key = config.key().clone();
        match self.handles.entry(key.clone()) {
            Entry::Occupied(existing) => Admission::Joined(existing.get().clone()),
            Entry::Vacant(slot) => {
                let id = JobId::new();
                let (completer, handle) = JobHandle::channel(key.clone(), id);

                self.sinks.insert(key.clone(), SinkEntry { id, sink });
                self.records.insert(
                    key,
                    JobRecord {
                        id,
                        config,
                        handle: handle.clone(),
                    },
                );
                slot.insert(handle.clone());

                Admission::Fresh { handle, completer }
            }
        }
    }

    pub fn handle(&self, key: &JobKey) -> Option<JobHandle> {
        self.handles.get(key).map(|h| h.value().clone())
    }

    pub fn record(&self, key: &JobKey) -> Option<JobRecord> {
        self.records.get(key).map(|r| r.value().clone())
    }

    /// Sink of the run currently registered under `key`, with that run's id.
    pub fn sink(&self, key: &JobKey) -> Option<(JobId, Arc<RedirectableSink>)> {
        self.sinks
            .get(key)
            .map(|e| (e.id, Arc::clone(&e.sink)))
    }

    /// Remove the sink of run `id`; `None` if it was already taken or belongs to another run.
    pub fn take_sink(&self, key: &JobKey, id: JobId) -> Option<Arc<RedirectableSink>> {
        self.sinks
            .remove_if(key, |_, e| e.id == id)
            .map(|(_, e)| e.sink)
    }

    /// Remove the record and the handle of run `id`.
    pub fn release(&self, key: &JobKey, id: JobId) {
        self.records.remove_if(key, |_, r| r.id == id);
        self.handles.remove_if(key, |_, h| h.id() == id);
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn records(&self) -> Vec<JobRecord> {
        self.records.iter().map(|r| r.value().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::discard;
    use jmaas_model::JobSpec;
    use std::time::SystemTime;

    fn config(key: &str) -> Arc<JobConfig> {
        Arc::new(
            JobConfig::new(
                JobKey::from(key),
                "inst",
                "test.jmx",
                JobSpec::new("example.com", "concurrency"),
                SystemTime::now(),
            )
            .unwrap(),
        )
    }

    fn sink(key: &str) -> Arc<RedirectableSink> {
        Arc::new(RedirectableSink::new(JobKey::from(key), discard()))
    }

    fn fresh(reg: &JobRegistry, key: &str) -> (JobHandle, Completer) {
        match reg.admit(config(key), sink(key)) {
            Admission::Fresh { handle, completer } => (handle, completer),
            Admission::Joined(_) => panic!("expected a fresh admission for {key}"),
        }
    }

    #[test]
    fn second_admission_joins_the_first() {
        let reg = JobRegistry::new();
        let (first, _completer) = fresh(&reg, "t1");

        match reg.admit(config("t1"), sink("t1")) {
            Admission::Joined(handle) => assert_eq!(handle.id(), first.id()),
            Admission::Fresh { .. } => panic!("duplicate run admitted"),
        }
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn all_tables_are_populated_on_admission() {
        let reg = JobRegistry::new();
        let key = JobKey::from("t1");
        let (handle, _completer) = fresh(&reg, "t1");

        assert_eq!(reg.handle(&key).map(|h| h.id()), Some(handle.id()));
        assert_eq!(reg.record(&key).map(|r| r.id()), Some(handle.id()));
        assert_eq!(reg.sink(&key).map(|(id, _)| id), Some(handle.id()));
    }

    #[test]
    fn take_sink_is_single_shot() {
        let reg = JobRegistry::new();
        let key = JobKey::from("t1");
        let (handle, _completer) = fresh(&reg, "t1");

        assert!(reg.take_sink(&key, handle.id()).is_some());
        assert!(reg.take_sink(&key, handle.id()).is_none());
    }

    #[test]
    fn stale_release_leaves_newer_run_alone() {
        let reg = JobRegistry::new();
        let key = JobKey::from("t1");

        let (old, _c1) = fresh(&reg, "t1");
        reg.take_sink(&key, old.id());
        reg.release(&key, old.id());
        assert!(reg.is_empty());

        let (new, _c2) = fresh(&reg, "t1");
        assert!(reg.take_sink(&key, old.id()).is_none());
        reg.release(&key, old.id());

        assert_eq!(reg.handle(&key).map(|h| h.id()), Some(new.id()));
        assert!(reg.record(&key).is_some());
        assert!(reg.sink(&key).is_some());
    }

    #[test]
    fn record_info_reports_failure_text() {
        let reg = JobRegistry::new();
        let key = JobKey::from("t1");
        let (_handle, completer) = fresh(&reg, "t1");

        completer.finish(Err(crate::JobFailure::Execution("exit code: 2".into())));
        let info = reg.record(&key).unwrap().info();
        assert_eq!(info.status, JobStatus::Failed);
        assert_eq!(info.error.as_deref(), Some("execution failed: exit code: 2"));
    }
}
