//! Tenant-aware cache layer.
//!
//! Business services read through [`TenantCache`] with cache-aside semantics
//! and invalidate through its scoped mutators and bulk eviction.
//!
//! # Tenant Isolation
//!
//! The [`TenantScopedKey`] type ensures that cache keys CANNOT be constructed
//! without a tenant. Every key the cache touches starts with `tenant:<tenant>:`,
//! and the segment rules make the encoding injective, so no key can be read
//! back as belonging to another tenant or organization.
//!
//! # Tiers
//!
//! Each namespace is served by exactly one tier:
//!
//! - **local**: process memory ([`LocalTier`]), no TTL, no scan
//! - **distributed**: shared store ([`RedisTier`], or [`InMemoryScanTier`] for a
//!   single process), TTL-enforcing and scannable for bulk eviction
//!
//! # Example
//!
//! ```ignore
//! let cache = TenantCache::new(config, Arc::new(LocalTier::new()), Arc::new(redis));
//!
//! let request = CacheRequest::new("acme", "sessions", "42").with_org("org1");
//! let session = cache
//!     .get_or_set(&request, || async { repo.load_session("42").await })
//!     .await?;
//!
//! // After a write to the system of record
//! cache.del_scoped(&request).await?;
//! cache.evict_namespace("acme", Some("org1"), "sessions").await?;
//! ```

pub mod events;
pub mod evictor;
pub mod fault;
pub mod in_memory;
pub mod local;
pub mod policy;
pub mod redis_backend;
pub mod tenant_cache;
pub mod tenant_key;
pub mod traits;

pub use events::{CacheEvent, EventBus};
pub use evictor::{BulkEvictor, EvictionReport};
pub use fault::{FaultInjectingTier, FaultOp};
pub use in_memory::InMemoryScanTier;
pub use local::LocalTier;
pub use policy::PolicyRegistry;
pub use redis_backend::RedisTier;
pub use tenant_cache::{CacheRequest, TenantCache};
pub use tenant_key::{KeyScope, TenantScopedKey};
pub use traits::{CacheStats, CacheTier, ScanTier};
