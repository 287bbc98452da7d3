//! Fault injection for tier failure paths.
//!
//! `FaultInjectingTier` wraps any tier and fails selected operations on
//! demand, so the degrade-to-miss and retry-then-abandon behavior can be
//! exercised without a flaky network.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashSet;
use tessera_core::{Tier, TierError};

use super::traits::{CacheTier, ScanTier};

/// Operation that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultOp {
    Get,
    Set,
    Delete,
    Scan,
    DeleteMany,
    Ping,
}

impl FaultOp {
    fn name(self) -> &'static str {
        match self {
            FaultOp::Get => "get",
            FaultOp::Set => "set",
            FaultOp::Delete => "delete",
            FaultOp::Scan => "scan",
            FaultOp::DeleteMany => "delete_many",
            FaultOp::Ping => "ping",
        }
    }
}

#[derive(Debug, Default)]
struct FaultSwitches {
    get: AtomicBool,
    set: AtomicBool,
    delete: AtomicBool,
    scan: AtomicBool,
    delete_many: AtomicBool,
    ping: AtomicBool,
}

impl FaultSwitches {
    fn switch(&self, op: FaultOp) -> &AtomicBool {
        match op {
            FaultOp::Get => &self.get,
            FaultOp::Set => &self.set,
            FaultOp::Delete => &self.delete,
            FaultOp::Scan => &self.scan,
            FaultOp::DeleteMany => &self.delete_many,
            FaultOp::Ping => &self.ping,
        }
    }
}

/// Tier wrapper with switchable failures.
///
/// Besides whole-operation failures, individual keys can be poisoned: any
/// `delete` of a poisoned key fails, and any `delete_many` containing one
/// fails as a whole.
#[derive(Debug)]
pub struct FaultInjectingTier<T> {
    inner: T,
    switches: FaultSwitches,
    poisoned: DashSet<String>,
}

impl<T: CacheTier> FaultInjectingTier<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            switches: FaultSwitches::default(),
            poisoned: DashSet::new(),
        }
    }

    /// The wrapped tier.
    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Make `op` fail until healed.
    pub fn fail(&self, op: FaultOp) {
        self.switches.switch(op).store(true, Ordering::SeqCst);
    }

    /// Stop failing `op`.
    pub fn heal(&self, op: FaultOp) {
        self.switches.switch(op).store(false, Ordering::SeqCst);
    }

    /// Stop every injected failure, including poisoned keys.
    pub fn heal_all(&self) {
        for op in [
            FaultOp::Get,
            FaultOp::Set,
            FaultOp::Delete,
            FaultOp::Scan,
            FaultOp::DeleteMany,
            FaultOp::Ping,
        ] {
            self.heal(op);
        }
        self.poisoned.clear();
    }

    /// Make every delete of `key` fail.
    pub fn poison_key(&self, key: impl Into<String>) {
        self.poisoned.insert(key.into());
    }

    fn check(&self, op: FaultOp) -> Result<(), TierError> {
        if self.switches.switch(op).load(Ordering::SeqCst) {
            return Err(self.injected(op));
        }
        Ok(())
    }

    fn injected(&self, op: FaultOp) -> TierError {
        TierError::Command {
            tier: self.inner.tier(),
            op: op.name(),
            reason: "injected fault".to_string(),
        }
    }
}

#[async_trait]
impl<T: CacheTier> CacheTier for FaultInjectingTier<T> {
    fn tier(&self) -> Tier {
        self.inner.tier()
    }

    async fn get(&self, key: &str) -> Result<Option<String>, TierError> {
        self.check(FaultOp::Get)?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), TierError> {
        self.check(FaultOp::Set)?;
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<(), TierError> {
        self.check(FaultOp::Delete)?;
        if self.poisoned.contains(key) {
            return Err(self.injected(FaultOp::Delete));
        }
        self.inner.delete(key).await
    }

    async fn ping(&self) -> Result<(), TierError> {
        self.check(FaultOp::Ping)?;
        self.inner.ping().await
    }
}

#[async_trait]
impl<T: ScanTier> ScanTier for FaultInjectingTier<T> {
    async fn scan(
        &self,
        cursor: u64,
        pattern: &str,
        count: usize,
    ) -> Result<(u64, Vec<String>), TierError> {
        self.check(FaultOp::Scan)?;
        self.inner.scan(cursor, pattern, count).await
    }

    async fn delete_many(&self, keys: &[String]) -> Result<u64, TierError> {
        self.check(FaultOp::DeleteMany)?;
        if keys.iter().any(|key| self.poisoned.contains(key)) {
            return Err(self.injected(FaultOp::DeleteMany));
        }
        self.inner.delete_many(keys).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{InMemoryScanTier, LocalTier};

    #[tokio::test]
    async fn test_passthrough_when_healthy() {
        let tier = FaultInjectingTier::new(LocalTier::new());
        tier.set("k", "v".to_string(), None).await.unwrap();
        assert_eq!(tier.get("k").await.unwrap().as_deref(), Some("v"));
        assert_eq!(tier.tier(), Tier::Local);
    }

    #[tokio::test]
    async fn test_fail_and_heal() {
        let tier = FaultInjectingTier::new(LocalTier::new());
        tier.fail(FaultOp::Get);
        assert!(matches!(
            tier.get("k").await,
            Err(TierError::Command { op: "get", .. })
        ));
        tier.heal(FaultOp::Get);
        assert!(tier.get("k").await.is_ok());
    }

    #[tokio::test]
    async fn test_poisoned_key() {
        let tier = FaultInjectingTier::new(InMemoryScanTier::new());
        tier.set("a", "1".to_string(), None).await.unwrap();
        tier.set("b", "1".to_string(), None).await.unwrap();
        tier.poison_key("a");

        let keys = vec!["a".to_string(), "b".to_string()];
        assert!(tier.delete_many(&keys).await.is_err());
        assert!(tier.delete("a").await.is_err());
        assert!(tier.delete("b").await.is_ok());

        tier.heal_all();
        assert!(tier.delete("a").await.is_ok());
        assert!(tier.inner().is_empty().await);
    }
}
