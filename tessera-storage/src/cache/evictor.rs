//! Pattern-based bulk eviction over a scannable tier.
//!
//! No inventory of live keys is kept, so eviction walks the key-space with a
//! cursor scan and deletes each page before requesting the next. The walk is
//! not atomic with respect to concurrent writers.
//!
//! # Failure Handling
//!
//! - A failed page delete is retried once per key with a singular delete.
//! - A key that fails its retry is abandoned with a warning; the walk goes on.
//! - A failed scan ends the walk early with `complete = false`.
//!
//! None of these surface as errors. The [`EvictionReport`] says what happened.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::events::{CacheEvent, EventBus};
use super::traits::ScanTier;

/// Outcome of one bulk eviction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EvictionReport {
    /// Glob pattern that was evicted.
    pub pattern: String,
    /// Scan pages requested.
    pub pages: u64,
    /// Matching keys returned by the scan.
    pub scanned: u64,
    /// Keys removed.
    pub deleted: u64,
    /// Keys retried individually after a failed page delete.
    pub retried: u64,
    /// Keys that could not be removed.
    pub abandoned: u64,
    /// Whether the scan ran to completion.
    pub complete: bool,
}

impl EvictionReport {
    fn new(pattern: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            ..Self::default()
        }
    }
}

/// Cursor-paged evictor bound to one distributed tier.
#[derive(Clone)]
pub struct BulkEvictor {
    tier: Arc<dyn ScanTier>,
    batch_size: usize,
    events: EventBus,
}

impl BulkEvictor {
    pub fn new(tier: Arc<dyn ScanTier>, batch_size: usize, events: EventBus) -> Self {
        Self {
            tier,
            batch_size: batch_size.max(1),
            events,
        }
    }

    /// Keys requested per scan page.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Delete every key matching `pattern`.
    pub async fn evict(&self, pattern: &str) -> EvictionReport {
        let mut report = EvictionReport::new(pattern);
        let mut cursor = 0u64;

        loop {
            let (next_cursor, keys) = match self.tier.scan(cursor, pattern, self.batch_size).await {
                Ok(page) => page,
                Err(e) => {
                    warn!(pattern = %pattern, cursor = cursor, error = %e, "Eviction scan failed, stopping early");
                    break;
                }
            };
            report.pages += 1;
            report.scanned += keys.len() as u64;

            if !keys.is_empty() {
                self.delete_page(&keys, &mut report).await;
            }

            if next_cursor == 0 {
                report.complete = true;
                break;
            }
            cursor = next_cursor;
        }

        info!(
            pattern = %report.pattern,
            pages = report.pages,
            deleted = report.deleted,
            retried = report.retried,
            abandoned = report.abandoned,
            complete = report.complete,
            "Bulk eviction finished"
        );
        self.events.publish(CacheEvent::EvictionCompleted {
            pattern: report.pattern.clone(),
            deleted: report.deleted,
            abandoned: report.abandoned,
            complete: report.complete,
        });

        report
    }

    async fn delete_page(&self, keys: &[String], report: &mut EvictionReport) {
        match self.tier.delete_many(keys).await {
            Ok(removed) => {
                debug!(count = keys.len(), removed = removed, "Evicted page");
                report.deleted += removed;
            }
            Err(e) => {
                warn!(count = keys.len(), error = %e, "Batch delete failed, retrying keys individually");
                for key in keys {
                    report.retried += 1;
                    match self.tier.delete(key).await {
                        Ok(()) => report.deleted += 1,
                        Err(e) => {
                            warn!(key = %key, error = %e, "Abandoning key after failed retry");
                            report.abandoned += 1;
                            self.events.publish(CacheEvent::EvictionKeyAbandoned {
                                key: key.clone(),
                                error: e.to_string(),
                            });
                        }
                    }
                }
            }
        }
    }
}
