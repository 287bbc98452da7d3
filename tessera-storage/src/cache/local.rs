//! Process-local tier backed by a `DashMap`.
//!
//! The local tier has no expiry: entries live until they are deleted or the
//! process restarts. TTLs handed to it are ignored. Namespaces that need
//! expiry should be pinned to the distributed tier.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tessera_core::{Tier, TierError};

use super::traits::CacheTier;

/// In-process cache tier. Cloning shares the underlying map.
#[derive(Debug, Clone, Default)]
pub struct LocalTier {
    entries: Arc<DashMap<String, String>>,
}

impl LocalTier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

#[async_trait]
impl CacheTier for LocalTier {
    fn tier(&self) -> Tier {
        Tier::Local
    }

    async fn get(&self, key: &str) -> Result<Option<String>, TierError> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), TierError> {
        if let Some(ttl) = ttl {
            tracing::trace!(key = %key, ttl_secs = ttl.as_secs(), "local tier ignores ttl");
        }
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), TierError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn ping(&self) -> Result<(), TierError> {
        Ok(())
    }
}
