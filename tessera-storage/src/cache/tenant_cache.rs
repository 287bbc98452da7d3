//! Tenant-aware cache orchestration.
//!
//! [`TenantCache`] ties policy resolution, key building, tier selection and
//! bulk eviction together behind the caller-facing API:
//!
//! - [`TenantCache::get_or_set`]: cache-aside read with write-back
//! - [`TenantCache::set_scoped`] / [`TenantCache::del_scoped`]: policy-aware mutators
//! - [`TenantCache::evict_namespace`] / [`TenantCache::evict_scope`]: bulk eviction
//!
//! # Failure Model
//!
//! Only key construction errors (and asking to bulk-evict an unscannable
//! tier) reach callers. Tier failures degrade: a failed read is a miss, a
//! failed write or delete is logged, counted and published as a
//! [`CacheEvent`]. The worst a broken tier can do is slow a caller down.
//!
//! # Concurrency
//!
//! Concurrent misses on the same key are not coalesced. Each caller runs its
//! own fetch and writes its own result; the last write wins.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tessera_core::{
    CacheConfig, EvictionError, KeyError, TesseraError, TesseraResult, Tier, TierError, TierHealth,
};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::events::{CacheEvent, EventBus};
use super::evictor::{BulkEvictor, EvictionReport};
use super::in_memory::InMemoryScanTier;
use super::local::LocalTier;
use super::policy::PolicyRegistry;
use super::tenant_key::TenantScopedKey;
use super::traits::{CacheStats, CacheTier, ScanTier};

// ============================================================================
// REQUESTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Item { namespace: String, item_id: String },
    Flat { raw_key: String },
}

/// Identifies one cached item plus optional per-call overrides.
///
/// Nothing is validated until a key is needed, so a request for a disabled
/// namespace never fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRequest {
    tenant: String,
    org: Option<String>,
    target: Target,
    ttl: Option<Duration>,
    tier: Option<Tier>,
}

impl CacheRequest {
    /// Request a namespaced item.
    pub fn new(
        tenant: impl Into<String>,
        namespace: impl Into<String>,
        item_id: impl Into<String>,
    ) -> Self {
        Self {
            tenant: tenant.into(),
            org: None,
            target: Target::Item {
                namespace: namespace.into(),
                item_id: item_id.into(),
            },
            ttl: None,
            tier: None,
        }
    }

    /// Request a flat, non-namespaced key.
    ///
    /// Flat requests have no namespace policy: they are enabled unless caching
    /// is globally off and use the explicit or global defaults.
    pub fn flat(tenant: impl Into<String>, raw_key: impl Into<String>) -> Self {
        Self {
            tenant: tenant.into(),
            org: None,
            target: Target::Flat {
                raw_key: raw_key.into(),
            },
            ttl: None,
            tier: None,
        }
    }

    /// Scope the request to an organization.
    pub fn with_org(mut self, org: impl Into<String>) -> Self {
        self.org = Some(org.into());
        self
    }

    /// Scope the request to an organization when one is given.
    pub fn with_optional_org(mut self, org: Option<impl Into<String>>) -> Self {
        self.org = org.map(Into::into);
        self
    }

    /// Override the namespace TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Override the namespace tier.
    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.tier = Some(tier);
        self
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    pub fn org(&self) -> Option<&str> {
        self.org.as_deref()
    }

    /// Namespace of the request. `None` for flat requests.
    pub fn namespace(&self) -> Option<&str> {
        match &self.target {
            Target::Item { namespace, .. } => Some(namespace),
            Target::Flat { .. } => None,
        }
    }

    /// Build the storage key for this request.
    pub fn key(&self) -> Result<TenantScopedKey, KeyError> {
        match &self.target {
            Target::Item { namespace, item_id } => {
                TenantScopedKey::new(&self.tenant, self.org.as_deref(), namespace, item_id)
            }
            Target::Flat { raw_key } => {
                if self.org.as_deref().is_some_and(|org| !org.is_empty()) {
                    return Err(KeyError::InvalidSegment {
                        segment: "org",
                        value: self.org.clone().unwrap_or_default(),
                        reason: "flat keys are tenant-scoped only".to_string(),
                    });
                }
                TenantScopedKey::flat(&self.tenant, raw_key)
            }
        }
    }
}

// ============================================================================
// STATISTICS
// ============================================================================

#[derive(Debug, Default)]
struct StatsCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    bypasses: AtomicU64,
    fetches: AtomicU64,
    read_errors: AtomicU64,
    write_failures: AtomicU64,
    delete_failures: AtomicU64,
    evicted: AtomicU64,
}

impl StatsCounters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            bypasses: self.bypasses.load(Ordering::Relaxed),
            fetches: self.fetches.load(Ordering::Relaxed),
            read_errors: self.read_errors.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            delete_failures: self.delete_failures.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
        }
    }
}

// ============================================================================
// TENANT CACHE
// ============================================================================

/// Tenant-aware cache over an exclusive local tier and a distributed tier.
///
/// Each request is served by exactly one tier. There is no read-through or
/// write-through between tiers. Cloning is cheap and shares tiers, counters
/// and the event channel.
#[derive(Clone)]
pub struct TenantCache {
    policies: PolicyRegistry,
    local: Arc<dyn CacheTier>,
    distributed: Arc<dyn ScanTier>,
    events: EventBus,
    stats: Arc<StatsCounters>,
    evictor: BulkEvictor,
}

impl std::fmt::Debug for TenantCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantCache")
            .field("config", self.policies.config())
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}

impl TenantCache {
    /// Create a cache over the given tiers.
    ///
    /// The config is shared read-only for the lifetime of the cache.
    pub fn new(
        config: Arc<CacheConfig>,
        local: Arc<dyn CacheTier>,
        distributed: Arc<dyn ScanTier>,
    ) -> Self {
        let events = EventBus::new(config.event_capacity);
        let evictor = BulkEvictor::new(distributed.clone(), config.scan_batch_size, events.clone());

        info!(
            enabled = config.enabled,
            namespaces = config.namespaces.len(),
            shard_count = config.shard_count,
            default_tier = %config.default_tier,
            "Tenant cache initialized"
        );

        Self {
            policies: PolicyRegistry::new(config),
            local,
            distributed,
            events,
            stats: Arc::new(StatsCounters::default()),
            evictor,
        }
    }

    /// Create a single-process cache: a [`LocalTier`] plus an
    /// [`InMemoryScanTier`] standing in for the distributed tier.
    pub fn in_memory(config: Arc<CacheConfig>) -> Self {
        Self::new(
            config,
            Arc::new(LocalTier::new()),
            Arc::new(InMemoryScanTier::new()),
        )
    }

    /// Policy resolution used by this cache.
    pub fn policies(&self) -> &PolicyRegistry {
        &self.policies
    }

    /// Snapshot of the cache counters.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    /// Subscribe to cache events.
    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.events.subscribe()
    }

    /// Deterministic shard index of a key under the configured shard count.
    ///
    /// Informational only; routing does not use it.
    pub fn shard_for(&self, key: &TenantScopedKey) -> u32 {
        key.shard_index(self.policies.config().shard_count)
    }

    /// Probe both tiers.
    pub async fn health(&self) -> Vec<TierHealth> {
        let mut report = Vec::with_capacity(2);
        for tier in [Tier::Local, Tier::Distributed] {
            let started = Instant::now();
            let result = match tier {
                Tier::Local => self.local.ping().await,
                Tier::Distributed => self.distributed.ping().await,
            };
            let elapsed = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
            let health = match result {
                Ok(()) => TierHealth::healthy(tier),
                Err(e) => TierHealth::unhealthy(tier, e.to_string()),
            };
            report.push(health.with_response_time(elapsed));
        }
        report
    }

    // ------------------------------------------------------------------------
    // Primitive operations
    // ------------------------------------------------------------------------

    /// Read a value from one tier.
    ///
    /// Absent, empty, undecodable and failed reads are all `None`. The other
    /// tier is never consulted.
    pub async fn get<T: DeserializeOwned>(&self, key: &TenantScopedKey, tier: Tier) -> Option<T> {
        let key_str = key.encode();
        let raw = match self.tier_get(tier, &key_str).await {
            Ok(raw) => raw,
            Err(e) => {
                self.read_failed(&key_str, tier, &e);
                return None;
            }
        };

        match raw.filter(|raw| !raw.is_empty()) {
            Some(raw) => match serde_json::from_str::<T>(&raw) {
                Ok(value) => {
                    StatsCounters::bump(&self.stats.hits);
                    debug!(key = %key_str, tier = %tier, "cache hit");
                    self.events.publish(CacheEvent::Hit { key: key_str, tier });
                    Some(value)
                }
                Err(e) => {
                    let err = TierError::Serialization {
                        reason: e.to_string(),
                    };
                    self.read_failed(&key_str, tier, &err);
                    None
                }
            },
            None => {
                StatsCounters::bump(&self.stats.misses);
                debug!(key = %key_str, tier = %tier, "cache miss");
                self.events.publish(CacheEvent::Miss { key: key_str, tier });
                None
            }
        }
    }

    /// Write a value to one tier. Returns whether the write succeeded.
    ///
    /// `ttl = None` stores without expiry. Failures are logged, never raised.
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &TenantScopedKey,
        value: &T,
        ttl: Option<Duration>,
        tier: Tier,
    ) -> bool {
        let key_str = key.encode();
        let result = match serde_json::to_string(value) {
            Ok(raw) => self.tier_set(tier, &key_str, raw, ttl).await,
            Err(e) => Err(TierError::Serialization {
                reason: e.to_string(),
            }),
        };

        match result {
            Ok(()) => {
                debug!(key = %key_str, tier = %tier, ttl_secs = ttl.map(|t| t.as_secs()), "cache set");
                true
            }
            Err(e) => {
                StatsCounters::bump(&self.stats.write_failures);
                warn!(key = %key_str, tier = %tier, error = %e, "Cache write failed");
                self.events.publish(CacheEvent::WriteFailed {
                    key: key_str,
                    tier,
                    error: e.to_string(),
                });
                false
            }
        }
    }

    /// Delete a value from one tier. Returns whether the delete succeeded.
    pub async fn delete(&self, key: &TenantScopedKey, tier: Tier) -> bool {
        let key_str = key.encode();
        match self.tier_delete(tier, &key_str).await {
            Ok(()) => {
                debug!(key = %key_str, tier = %tier, "cache delete");
                true
            }
            Err(e) => {
                StatsCounters::bump(&self.stats.delete_failures);
                warn!(key = %key_str, tier = %tier, error = %e, "Cache delete failed");
                self.events.publish(CacheEvent::DeleteFailed {
                    key: key_str,
                    tier,
                    error: e.to_string(),
                });
                false
            }
        }
    }

    // ------------------------------------------------------------------------
    // Caller-facing operations
    // ------------------------------------------------------------------------

    /// Cache-aside read.
    ///
    /// - Disabled namespace: `fetch` runs directly, no key is built.
    /// - Hit: the cached value is returned and `fetch` is not called.
    /// - Miss: `fetch` runs once; a `Some` result is written back with the
    ///   resolved TTL and tier, then returned whether or not the write worked.
    ///
    /// Errors from `fetch` propagate unchanged. The only cache error a caller
    /// can see is a key construction error, converted into `E`.
    pub async fn get_or_set<T, E, F, Fut>(&self, request: &CacheRequest, fetch: F) -> Result<Option<T>, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<TesseraError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
    {
        if !self.is_enabled(request) {
            self.bypass(request);
            StatsCounters::bump(&self.stats.fetches);
            return fetch().await;
        }

        let key = request
            .key()
            .map_err(|e| E::from(TesseraError::from(e)))?;
        let namespace = request.namespace();
        let tier = self.policies.resolve_tier(namespace, request.tier);

        if let Some(cached) = self.get::<T>(&key, tier).await {
            return Ok(Some(cached));
        }

        StatsCounters::bump(&self.stats.fetches);
        let fetched = fetch().await?;

        if let Some(value) = &fetched {
            let ttl = self.policies.resolve_ttl(namespace, request.ttl);
            self.set(&key, value, ttl, tier).await;
        }

        Ok(fetched)
    }

    /// Write a value using namespace policy for TTL and tier.
    ///
    /// Returns the written key, or `None` when the namespace is disabled or
    /// the write failed.
    pub async fn set_scoped<T: Serialize + ?Sized>(
        &self,
        request: &CacheRequest,
        value: &T,
    ) -> TesseraResult<Option<String>> {
        if !self.is_enabled(request) {
            self.bypass(request);
            return Ok(None);
        }

        let key = request.key()?;
        let namespace = request.namespace();
        let tier = self.policies.resolve_tier(namespace, request.tier);
        let ttl = self.policies.resolve_ttl(namespace, request.ttl);

        let written = self.set(&key, value, ttl, tier).await;
        Ok(written.then(|| key.encode()))
    }

    /// Delete a value from the namespace's tier.
    ///
    /// Returns the deleted key, or `None` when the namespace is disabled or
    /// the delete failed.
    pub async fn del_scoped(&self, request: &CacheRequest) -> TesseraResult<Option<String>> {
        if !self.is_enabled(request) {
            self.bypass(request);
            return Ok(None);
        }

        let key = request.key()?;
        let tier = self.policies.resolve_tier(request.namespace(), request.tier);

        let deleted = self.delete(&key, tier).await;
        Ok(deleted.then(|| key.encode()))
    }

    /// Remove every key of a namespace within a tenant or organization scope.
    ///
    /// Runs regardless of the namespace's enabled flag, so stale entries
    /// written before a namespace was disabled can still be flushed.
    ///
    /// # Errors
    ///
    /// - [`KeyError`] for an invalid tenant, org or namespace
    /// - [`EvictionError::ScanUnsupported`] when the namespace is pinned to
    ///   the local tier
    pub async fn evict_namespace(
        &self,
        tenant: &str,
        org: Option<&str>,
        namespace: &str,
    ) -> TesseraResult<EvictionReport> {
        let pattern = TenantScopedKey::namespace_pattern(tenant, org, namespace)?;

        let tier = self.policies.resolve_tier(Some(namespace), None);
        if tier != Tier::Distributed {
            return Err(EvictionError::ScanUnsupported {
                namespace: namespace.to_string(),
                tier,
            }
            .into());
        }

        Ok(self.run_eviction(&pattern).await)
    }

    /// Remove every distributed-tier key within a tenant or organization
    /// scope, across all namespaces and flat keys.
    ///
    /// A tenant-level scope includes the tenant's organization-scoped keys.
    /// Local-tier entries are untouched.
    pub async fn evict_scope(&self, tenant: &str, org: Option<&str>) -> TesseraResult<EvictionReport> {
        let pattern = TenantScopedKey::scope_pattern(tenant, org)?;
        Ok(self.run_eviction(&pattern).await)
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn is_enabled(&self, request: &CacheRequest) -> bool {
        match request.namespace() {
            Some(namespace) => self.policies.is_namespace_enabled(namespace),
            None => self.policies.is_globally_enabled(),
        }
    }

    fn bypass(&self, request: &CacheRequest) {
        StatsCounters::bump(&self.stats.bypasses);
        debug!(namespace = ?request.namespace(), "cache bypassed for disabled namespace");
        self.events.publish(CacheEvent::Bypass {
            namespace: request.namespace().map(str::to_string),
        });
    }

    fn read_failed(&self, key: &str, tier: Tier, error: &TierError) {
        StatsCounters::bump(&self.stats.read_errors);
        StatsCounters::bump(&self.stats.misses);
        warn!(key = %key, tier = %tier, error = %error, "Cache read failed, treating as miss");
        self.events.publish(CacheEvent::ReadFailed {
            key: key.to_string(),
            tier,
            error: error.to_string(),
        });
    }

    async fn run_eviction(&self, pattern: &str) -> EvictionReport {
        let report = self.evictor.evict(pattern).await;
        self.stats.evicted.fetch_add(report.deleted, Ordering::Relaxed);
        self.stats
            .delete_failures
            .fetch_add(report.abandoned, Ordering::Relaxed);
        report
    }

    async fn tier_get(&self, tier: Tier, key: &str) -> Result<Option<String>, TierError> {
        match tier {
            Tier::Local => self.local.get(key).await,
            Tier::Distributed => self.distributed.get(key).await,
        }
    }

    async fn tier_set(
        &self,
        tier: Tier,
        key: &str,
        value: String,
        ttl: Option<Duration>,
    ) -> Result<(), TierError> {
        match tier {
            Tier::Local => self.local.set(key, value, ttl).await,
            Tier::Distributed => self.distributed.set(key, value, ttl).await,
        }
    }

    async fn tier_delete(&self, tier: Tier, key: &str) -> Result<(), TierError> {
        match tier {
            Tier::Local => self.local.delete(key).await,
            Tier::Distributed => self.distributed.delete(key).await,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
