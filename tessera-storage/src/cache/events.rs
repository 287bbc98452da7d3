//! Cache event stream.
//!
//! The cache never fails a caller because of a tier problem, so failures would
//! otherwise be invisible. Every swallowed failure, along with hits, misses and
//! eviction outcomes, is published as a [`CacheEvent`] on a broadcast channel.

use serde::Serialize;
use tessera_core::Tier;
use tokio::sync::broadcast;
use tracing::trace;

/// Observable cache outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CacheEvent {
    /// A read returned a cached value.
    Hit { key: String, tier: Tier },

    /// A read found nothing.
    Miss { key: String, tier: Tier },

    /// The namespace is disabled; the fetch ran without touching a tier.
    Bypass { namespace: Option<String> },

    /// A read failed or returned an undecodable value. Treated as a miss.
    ReadFailed {
        key: String,
        tier: Tier,
        error: String,
    },

    /// A write failed. The value was still returned to the caller.
    WriteFailed {
        key: String,
        tier: Tier,
        error: String,
    },

    /// A delete failed.
    DeleteFailed {
        key: String,
        tier: Tier,
        error: String,
    },

    /// A key survived both the batch delete and its single retry.
    EvictionKeyAbandoned { key: String, error: String },

    /// A bulk eviction finished.
    EvictionCompleted {
        pattern: String,
        deleted: u64,
        abandoned: u64,
        complete: bool,
    },
}

impl CacheEvent {
    /// Short name of the event, for logs.
    pub fn event_type(&self) -> &'static str {
        match self {
            CacheEvent::Hit { .. } => "hit",
            CacheEvent::Miss { .. } => "miss",
            CacheEvent::Bypass { .. } => "bypass",
            CacheEvent::ReadFailed { .. } => "read_failed",
            CacheEvent::WriteFailed { .. } => "write_failed",
            CacheEvent::DeleteFailed { .. } => "delete_failed",
            CacheEvent::EvictionKeyAbandoned { .. } => "eviction_key_abandoned",
            CacheEvent::EvictionCompleted { .. } => "eviction_completed",
        }
    }

    /// Whether the event reports a swallowed failure.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            CacheEvent::ReadFailed { .. }
                | CacheEvent::WriteFailed { .. }
                | CacheEvent::DeleteFailed { .. }
                | CacheEvent::EvictionKeyAbandoned { .. }
        )
    }
}

/// Broadcast sender shared by a cache and its evictor.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<CacheEvent>,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per slow subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish an event. Dropped silently when nobody is subscribed.
    pub fn publish(&self, event: CacheEvent) {
        let event_type = event.event_type();
        if let Ok(receivers) = self.tx.send(event) {
            trace!(event_type = event_type, receivers = receivers, "Published cache event");
        }
    }

    /// Subscribe to all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.tx.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
