//! Bounded execution of job units.
//!
//! A fixed set of workers pulls units from a shared queue; submissions beyond the worker count wait in the queue.
//! Each unit runs in its own task so a panic fails that run only and the worker keeps serving the queue.
use std::{
    any::Any,
    future::Future,
    pin::Pin,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Instant,
};

use jmaas_model::{JobId, JobKey};
use tokio::sync::mpsc;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, trace, warn};

use crate::{
    error::JobFailure,
    handle::{Completer, Completion, JobHandle, JobOutcome},
};

/// A runnable unit: a lazy future that resolves when the external work terminates.
pub type JobUnit = Pin<Box<dyn Future<Output = Result<(), JobFailure>> + Send + 'static>>;

pub type HookFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Hook invoked exactly once with the terminal result, after the handle has been resolved.
pub type CompletionHook = Box<dyn FnOnce(JobOutcome) -> HookFuture + Send + 'static>;

/// Box an async closure as a [`CompletionHook`].
pub fn completion_hook<F, Fut>(f: F) -> CompletionHook
where
    F: FnOnce(JobOutcome) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Box::new(move |outcome| -> HookFuture { Box::pin(f(outcome)) })
}

struct Work {
    completer: Completer,
    unit: JobUnit,
    hook: Option<CompletionHook>,
}

type SharedQueue = Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Work>>>;

pub struct ExecutionEngine {
    queue: Mutex<Option<mpsc::UnboundedSender<Work>>>,
    tracker: TaskTracker,
    workers: usize,
}

impl ExecutionEngine {
    /// Start `workers` workers (at least one) on the current Tokio runtime.
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        let (tx, rx) = mpsc::unbounded_channel::<Work>();
        let rx: SharedQueue = Arc::new(tokio::sync::Mutex::new(rx));

        let tracker = TaskTracker::new();
        for worker in 0..workers {
            tracker.spawn(worker_loop(worker, Arc::clone(&rx)));
        }
        debug!(target: "jmaas.core.engine", workers, "execution engine started");

        Self {
            queue: Mutex::new(Some(tx)),
            tracker,
            workers,
        }
    }

    #[inline]
    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.queue).is_none()
    }

    /// Queue `unit` and return its handle immediately.
    pub fn submit(
        &self,
        key: JobKey,
        id: JobId,
        unit: JobUnit,
        hook: Option<CompletionHook>,
    ) -> JobHandle {
        let (completer, handle) = JobHandle::channel(key, id);
        self.dispatch(completer, unit, hook);
        handle
    }

    /// Queue `unit` for a handle created beforehand with [`JobHandle::channel`].
    ///
    /// After [`shutdown`](Self::shutdown) the run fails with [`JobFailure::EngineClosed`]; the hook still runs.
    pub fn dispatch(&self, completer: Completer, unit: JobUnit, hook: Option<CompletionHook>) {
        let work = Work {
            completer,
            unit,
            hook,
        };

        let rejected = match &*lock(&self.queue) {
            Some(tx) => tx.send(work).err().map(|e| e.0),
            None => Some(work),
        };

        if let Some(work) = rejected {
            warn!(target: "jmaas.core.engine", key = %work.completer.key(), "engine is shut down; rejecting job");
            self.tracker.spawn(finish(
                work.completer,
                Err(JobFailure::EngineClosed),
                work.hook,
            ));
        }
    }

    /// Stop accepting units and wait until queued and running ones have terminated.
    pub async fn shutdown(&self) {
        let queue = lock(&self.queue).take();
        drop(queue);

        self.tracker.close();
        self.tracker.wait().await;
        debug!(target: "jmaas.core.engine", "execution engine drained");
    }
}

async fn worker_loop(worker: usize, rx: SharedQueue) {
    loop {
        let next = {
            let mut rx = rx.lock().await;
            rx.recv().await
        };
        let Some(work) = next else {
            break;
        };
        run(worker, work).await;
    }
    trace!(target: "jmaas.core.engine", worker, "worker stopped");
}

async fn run(worker: usize, work: Work) {
    let Work {
        completer,
        unit,
        hook,
    } = work;

    completer.running();
    trace!(target: "jmaas.core.engine", worker, key = %completer.key(), job_id = %completer.id(), "unit started");

    let started = Instant::now();
    let outcome = match tokio::spawn(unit).await {
        Ok(Ok(())) => Ok(Completion {
            elapsed: started.elapsed(),
        }),
        Ok(Err(failure)) => Err(failure),
        Err(e) if e.is_panic() => Err(JobFailure::Panicked(panic_message(e.into_panic()))),
        Err(_) => Err(JobFailure::Abandoned),
    };

    finish(completer, outcome, hook).await;
}

async fn finish(completer: Completer, outcome: JobOutcome, hook: Option<CompletionHook>) {
    let key = completer.key().clone();
    completer.finish(outcome.clone());

    if let Some(hook) = hook
        && let Err(e) = tokio::spawn(hook(outcome)).await
    {
        error!(target: "jmaas.core.engine", key = %key, error = %e, "completion hook failed");
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        return (*s).to_string();
    }
    if let Some(s) = payload.downcast_ref::<String>() {
        return s.clone();
    }
    "unknown panic payload".to_string()
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
