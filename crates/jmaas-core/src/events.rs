//! Job lifecycle events and their fan-out to subscribers.
//!
//! Publishing never blocks: each subscriber owns a bounded queue drained by its own task. An event that does not fit
//! in a subscriber's queue is dropped for that subscriber only.
use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::{Duration, SystemTime},
};

use async_trait::async_trait;
use jmaas_model::{JobId, JobKey, JobName};
use tokio::sync::mpsc;
use tokio_util::task::TaskTracker;
use tracing::{error, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobEventKind {
    /// A new run was admitted and queued.
    Submitted,
    /// A submission joined the run already in flight.
    Deduplicated,
    /// A caller re-pointed the attached destination.
    Attached,
    /// A worker picked the run up.
    Started,
    Succeeded,
    Failed,
    /// A best-effort cleanup step failed.
    CleanupFailed,
    /// The run was removed from the registry.
    Cleaned,
}

impl JobEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobEventKind::Submitted => "submitted",
            JobEventKind::Deduplicated => "deduplicated",
            JobEventKind::Attached => "attached",
            JobEventKind::Started => "started",
            JobEventKind::Succeeded => "succeeded",
            JobEventKind::Failed => "failed",
            JobEventKind::CleanupFailed => "cleanup_failed",
            JobEventKind::Cleaned => "cleaned",
        }
    }
}

#[derive(Debug, Clone)]
pub struct JobEvent {
    pub kind: JobEventKind,
    pub key: JobKey,
    pub id: Option<JobId>,
    pub name: Option<JobName>,
    pub reason: Option<String>,
    pub elapsed: Option<Duration>,
    pub at: SystemTime,
}

impl JobEvent {
    pub fn new(kind: JobEventKind, key: JobKey) -> Self {
        Self {
            kind,
            key,
            id: None,
            name: None,
            reason: None,
            elapsed: None,
            at: SystemTime::now(),
        }
    }

    #[inline]
    pub fn with_id(mut self, id: JobId) -> Self {
        self.id = Some(id);
        self
    }

    #[inline]
    pub fn with_name(mut self, name: JobName) -> Self {
        self.name = Some(name);
        self
    }

    #[inline]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    #[inline]
    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = Some(elapsed);
        self
    }
}

#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    async fn on_event(&self, event: &JobEvent);

    fn name(&self) -> &'static str;

    /// Events buffered for this subscriber before new ones are dropped.
    fn queue_capacity(&self) -> usize {
        1024
    }
}

struct Queue {
    name: &'static str,
    tx: mpsc::Sender<Arc<JobEvent>>,
}

/// Fan-out of events to a fixed set of subscribers.
pub struct Subscribers {
    queues: Mutex<Vec<Queue>>,
    tracker: TaskTracker,
}

impl Subscribers {
    /// Start one delivery task per subscriber on the current Tokio runtime.
    pub fn new(subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        let tracker = TaskTracker::new();
        let queues = subscribers
            .into_iter()
            .map(|sub| {
                let (tx, rx) = mpsc::channel(sub.queue_capacity().max(1));
                let name = sub.name();
                tracker.spawn(deliver(sub, rx));
                Queue { name, tx }
            })
            .collect();

        Self {
            queues: Mutex::new(queues),
            tracker,
        }
    }

    /// No subscribers; every event is dropped.
    pub fn none() -> Self {
        Self {
            queues: Mutex::new(Vec::new()),
            tracker: TaskTracker::new(),
        }
    }

    pub fn publish(&self, event: JobEvent) {
        let queues = lock(&self.queues);
        if queues.is_empty() {
            return;
        }

        let event = Arc::new(event);
        for q in queues.iter() {
            if let Err(e) = q.tx.try_send(Arc::clone(&event)) {
                warn!(target: "jmaas.core.events", subscriber = q.name, kind = event.kind.as_str(), error = %e, "event dropped for subscriber");
            }
        }
    }

    /// Stop accepting events and wait until every queued one was delivered.
    pub async fn close(&self) {
        lock(&self.queues).clear();
        self.tracker.close();
        self.tracker.wait().await;
    }
}

async fn deliver(sub: Arc<dyn Subscribe>, mut rx: mpsc::Receiver<Arc<JobEvent>>) {
    let name = sub.name();
    while let Some(event) = rx.recv().await {
        let sub = Arc::clone(&sub);
        let delivered = tokio::spawn(async move { sub.on_event(&event).await }).await;
        if let Err(e) = delivered {
            error!(target: "jmaas.core.events", subscriber = name, error = %e, "subscriber panicked while processing an event");
        }
    }
    trace!(target: "jmaas.core.events", subscriber = name, "subscriber queue closed");
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
