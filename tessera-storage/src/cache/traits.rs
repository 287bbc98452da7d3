//! Cache tier traits and statistics.
//!
//! Tiers are deliberately asymmetric. Every tier implements [`CacheTier`]
//! (get/set/delete); only tiers with a shared, enumerable key-space implement
//! the [`ScanTier`] capability that bulk eviction depends on.
//!
//! # Values
//!
//! Tiers store opaque strings. The orchestrator serializes values as JSON
//! before they reach a tier, so a tier never needs to know the value type.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tessera_core::{Tier, TierError};

/// Narrow tier contract shared by every backend.
///
/// Implementations must be thread-safe. Errors are returned as [`TierError`];
/// the orchestrator decides how to degrade, so tiers should not swallow
/// failures themselves.
#[async_trait]
pub trait CacheTier: Send + Sync {
    /// Which tier slot this backend serves.
    fn tier(&self) -> Tier;

    /// Read a value. `Ok(None)` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, TierError>;

    /// Write a value. `ttl = None` stores without expiry.
    ///
    /// Tiers without expiry support ignore `ttl`.
    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), TierError>;

    /// Remove a value. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), TierError>;

    /// Liveness probe for health checks.
    async fn ping(&self) -> Result<(), TierError>;
}

/// Key-space enumeration capability, implemented only by distributed tiers.
#[async_trait]
pub trait ScanTier: CacheTier {
    /// One page of a cursor scan.
    ///
    /// Start with cursor `0`. Returns the next cursor and the keys of this
    /// page matching the glob `pattern`; a returned cursor of `0` means the
    /// scan is complete. `count` is a hint for how much of the key-space to
    /// examine per page, so pages may be empty before the scan completes.
    async fn scan(
        &self,
        cursor: u64,
        pattern: &str,
        count: usize,
    ) -> Result<(u64, Vec<String>), TierError>;

    /// Remove many keys in one round-trip. Returns the number removed.
    async fn delete_many(&self, keys: &[String]) -> Result<u64, TierError>;
}

/// Point-in-time counters for a [`TenantCache`](super::TenantCache).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Reads that returned a cached value.
    pub hits: u64,
    /// Reads that found nothing (including read errors).
    pub misses: u64,
    /// Calls that skipped the cache because the namespace was disabled.
    pub bypasses: u64,
    /// Fallback fetches invoked.
    pub fetches: u64,
    /// Reads that failed at the tier or could not be decoded.
    pub read_errors: u64,
    /// Writes that failed at the tier.
    pub write_failures: u64,
    /// Deletes that failed at the tier, including abandoned eviction keys.
    pub delete_failures: u64,
    /// Keys removed by bulk eviction.
    pub evicted: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate_empty() {
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate() {
        let stats = CacheStats {
            hits: 3,
            misses: 1,
            ..CacheStats::default()
        };
        assert!((stats.hit_rate() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_bypasses_do_not_affect_hit_rate() {
        let stats = CacheStats {
            hits: 1,
            misses: 1,
            bypasses: 10,
            ..CacheStats::default()
        };
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
    }
}
