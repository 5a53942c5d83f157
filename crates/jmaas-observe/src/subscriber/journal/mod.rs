use async_trait::async_trait;
use jmaas_core::{JobEvent, Subscribe};

use crate::subscriber::view::log_event;

/// Writes every job lifecycle event to the log.
#[derive(Debug, Default)]
pub struct Journal;

impl Journal {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for Journal {
    async fn on_event(&self, event: &JobEvent) {
        log_event(event);
    }
    fn name(&self) -> &'static str {
        "journal"
    }
    fn queue_capacity(&self) -> usize {
        2048
    }
}
