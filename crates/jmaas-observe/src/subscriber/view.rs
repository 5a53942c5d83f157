use std::borrow::Borrow;

use jmaas_core::{JobEvent, JobEventKind};
use tracing::{debug, error, info, trace, warn};

pub trait View {
    fn as_key(&self) -> &str;
    fn as_name(&self) -> &str;
    fn as_reason(&self) -> &str;
    fn elapsed_ms(&self) -> u64;
    fn kind(&self) -> JobEventKind;
}

impl<T> View for T
where
    T: Borrow<JobEvent>,
{
    #[inline]
    fn as_key(&self) -> &str {
        self.borrow().key.as_str()
    }
    #[inline]
    fn as_name(&self) -> &str {
        self.borrow().name.as_ref().map(|n| n.as_str()).unwrap_or("unknown")
    }
    #[inline]
    fn as_reason(&self) -> &str {
        self.borrow().reason.as_deref().unwrap_or("unknown")
    }
    #[inline]
    fn elapsed_ms(&self) -> u64 {
        self.borrow()
            .elapsed
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
    #[inline]
    fn kind(&self) -> JobEventKind {
        self.borrow().kind
    }
}

#[inline]
pub fn message_for(kind: JobEventKind) -> &'static str {
    match kind {
        // admission
        JobEventKind::Submitted => "job submitted (queued for a worker)",
        JobEventKind::Deduplicated => "duplicate submission joined the job in flight",
        JobEventKind::Attached => "output attached to a new destination",

        // execution
        JobEventKind::Started => "job is starting",
        JobEventKind::Succeeded => "job finished successfully",
        JobEventKind::Failed => "job failed",

        // cleanup
        JobEventKind::CleanupFailed => "cleanup step failed (best effort; continuing)",
        JobEventKind::Cleaned => "job cleaned up and removed",
    }
}

#[inline]
pub fn log_event<E: View>(e: E) {
    let msg = message_for(e.kind());

    match e.kind() {
        // admission
        JobEventKind::Submitted => debug!(key = e.as_key(), name = e.as_name(), "{msg}"),
        JobEventKind::Deduplicated => warn!(key = e.as_key(), "{msg}"),
        JobEventKind::Attached => debug!(key = e.as_key(), "{msg}"),

        // execution
        JobEventKind::Started => info!(key = e.as_key(), name = e.as_name(), "{msg}"),
        JobEventKind::Succeeded => info!(
            key = e.as_key(),
            name = e.as_name(),
            elapsed_ms = e.elapsed_ms(),
            "{msg}"
        ),
        JobEventKind::Failed => error!(
            key = e.as_key(),
            name = e.as_name(),
            reason = e.as_reason(),
            "{msg}"
        ),

        // cleanup
        JobEventKind::CleanupFailed => {
            warn!(key = e.as_key(), reason = e.as_reason(), "{msg}")
        }
        JobEventKind::Cleaned => trace!(key = e.as_key(), name = e.as_name(), "{msg}"),
    }
}
