//! Tessera Storage - Tenant-Aware Cache Orchestration
//!
//! Cache-aside reads, policy-driven writes and pattern eviction over an
//! exclusive local tier and a distributed tier. Shared types (config, errors,
//! key-segment rules) live in `tessera-core`.

pub mod cache;

pub use cache::{
    BulkEvictor, CacheEvent, CacheRequest, CacheStats, CacheTier, EventBus, EvictionReport,
    FaultInjectingTier, FaultOp, InMemoryScanTier, KeyScope, LocalTier, PolicyRegistry, RedisTier,
    ScanTier, TenantCache, TenantScopedKey,
};
