//! # Retry and Dead-Letter Buffers
//!
//! Unbounded in-memory buffers for failed events. The retry buffer holds
//! events awaiting their single additional attempt; the dead-letter buffer is
//! terminal and only exposed for operator inspection.
//!
//! Both buffers are append-only from two call paths (the router's failure
//! path and the drain cycle's re-failure path), so a plain mutex suffices.

use crate::events::WebhookEvent;
use parking_lot::Mutex;
use tracing::{info, warn};

/// Buffer of events awaiting exactly one retry attempt.
#[derive(Debug, Default)]
pub struct RetryQueue {
    events: Mutex<Vec<WebhookEvent>>,
}

impl RetryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event with a refreshed timestamp.
    pub fn enqueue(&self, event: &WebhookEvent) {
        info!(
            event_type = %event.event_type,
            source_branch = %event.source_branch,
            "🔄 Added to retry queue"
        );
        self.events.lock().push(event.refreshed());
    }

    /// Pop up to `batch_size` events for resubmission, oldest first.
    pub fn drain_batch(&self, batch_size: usize) -> Vec<WebhookEvent> {
        let mut events = self.events.lock();
        let take = batch_size.min(events.len());
        events.drain(..take).collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

/// Terminal buffer for events that require manual intervention.
#[derive(Debug, Default)]
pub struct DeadLetterQueue {
    events: Mutex<Vec<WebhookEvent>>,
}

impl DeadLetterQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, event: &WebhookEvent) {
        warn!(
            event_type = %event.event_type,
            source_branch = %event.source_branch,
            unique_id = %event.unique_id,
            "💀 Added to dead letter queue"
        );
        self.events.lock().push(event.clone());
    }

    /// Snapshot of the buffer for operator inspection. Entries are never
    /// requeued automatically.
    pub fn snapshot(&self) -> Vec<WebhookEvent> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}
