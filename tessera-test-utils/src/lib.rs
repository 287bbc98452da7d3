//! Tessera Test Utilities
//!
//! Shared test infrastructure for the Tessera workspace:
//! - Proptest generators for key segments and configs
//! - Test fixtures for common scenarios
//! - A counting fetch for cache-aside tests
//! - Custom assertions for Tessera-specific errors

pub use tessera_core::{
    CacheConfig, EvictionError, KeyError, NamespacePolicy, TesseraError, TesseraResult, Tier,
};

use std::future::{ready, Ready};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ============================================================================
// COUNTING FETCH
// ============================================================================

/// Counts invocations of fallback fetches handed to `get_or_set`.
///
/// Clones share the counter, so a clone can be moved into a spawned task.
#[derive(Debug, Clone, Default)]
pub struct FetchCounter {
    calls: Arc<AtomicUsize>,
}

impl FetchCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of fetches invoked so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// A fetch that records its invocation and yields `value`.
    pub fn returning<T>(&self, value: Option<T>) -> impl FnOnce() -> Ready<TesseraResult<Option<T>>> {
        let calls = Arc::clone(&self.calls);
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            ready(Ok(value))
        }
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies producing valid key segments.

    use super::*;
    use proptest::prelude::*;

    /// Generate a valid tenant code.
    pub fn arb_tenant() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9_-]{0,15}"
    }

    /// Generate a valid organization code.
    pub fn arb_org() -> impl Strategy<Value = String> {
        "[a-z0-9][a-z0-9_-]{0,15}"
    }

    /// Generate a valid namespace name (never the reserved `org`).
    pub fn arb_namespace() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9_-]{0,15}".prop_filter("reserved namespace", |ns| ns != "org")
    }

    /// Generate an item id. Ids may contain the key separator.
    pub fn arb_item_id() -> impl Strategy<Value = String> {
        "[A-Za-z0-9_:-]{1,24}"
    }

    /// Generate a valid flat raw key.
    pub fn arb_raw_key() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9_:-]{0,24}"
            .prop_filter("organization marker", |raw| raw != "org" && !raw.starts_with("org:"))
    }

    /// Generate a tier.
    pub fn arb_tier() -> impl Strategy<Value = Tier> {
        prop_oneof![Just(Tier::Local), Just(Tier::Distributed)]
    }

    /// Generate a namespace policy.
    pub fn arb_policy() -> impl Strategy<Value = NamespacePolicy> {
        (
            any::<bool>(),
            proptest::option::of(0u64..=86_400),
            proptest::option::of(arb_tier()),
        )
            .prop_map(|(enabled, ttl, tier)| NamespacePolicy {
                enabled,
                default_ttl_seconds: ttl,
                preferred_tier: tier,
            })
    }

    /// Generate a valid cache config.
    pub fn arb_config() -> impl Strategy<Value = CacheConfig> {
        (
            any::<bool>(),
            1u32..=64,
            proptest::collection::btree_map(arb_namespace(), arb_policy(), 0..6),
            1usize..=2000,
            arb_tier(),
        )
            .prop_map(|(enabled, shard_count, namespaces, scan_batch_size, default_tier)| {
                CacheConfig {
                    enabled,
                    shard_count,
                    namespaces,
                    scan_batch_size,
                    default_tier,
                    ..CacheConfig::default()
                }
            })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built test fixtures for common testing scenarios.

    use super::*;

    pub const TENANT: &str = "acme";
    pub const OTHER_TENANT: &str = "globex";
    pub const ORG: &str = "org1";
    pub const OTHER_ORG: &str = "org2";

    /// Sessions TTL in the standard fixture: one day.
    pub const SESSIONS_TTL_SECS: u64 = 86_400;

    /// Standard config:
    /// - `sessions`: distributed, one-day TTL
    /// - `mentor`: distributed, one-hour TTL
    /// - `permissions`: local tier, five-minute TTL (ignored by the local tier)
    /// - `reports`: disabled
    pub fn sessions_config() -> CacheConfig {
        CacheConfig::new()
            .with_namespace(
                "sessions",
                NamespacePolicy::new().with_ttl_secs(SESSIONS_TTL_SECS),
            )
            .with_namespace("mentor", NamespacePolicy::new().with_ttl_secs(3_600))
            .with_namespace(
                "permissions",
                NamespacePolicy::new()
                    .with_ttl_secs(300)
                    .with_tier(Tier::Local),
            )
            .with_namespace("reports", NamespacePolicy::new().with_enabled(false))
    }

    /// The standard config as a shared handle.
    pub fn shared_sessions_config() -> Arc<CacheConfig> {
        Arc::new(sessions_config())
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Custom assertions for Tessera results.

    use super::*;

    /// Assert a result failed because the tenant was missing.
    pub fn assert_missing_tenant<T: std::fmt::Debug>(result: &TesseraResult<T>) {
        assert!(
            matches!(result, Err(TesseraError::Key(KeyError::MissingTenant))),
            "Expected missing-tenant error, got {:?}",
            result
        );
    }

    /// Assert a result failed with any key error.
    pub fn assert_key_error<T: std::fmt::Debug>(result: &TesseraResult<T>) {
        assert!(
            matches!(result, Err(TesseraError::Key(_))),
            "Expected key error, got {:?}",
            result
        );
    }

    /// Assert bulk eviction was refused because the tier cannot be scanned.
    pub fn assert_scan_unsupported<T: std::fmt::Debug>(result: &TesseraResult<T>) {
        assert!(
            matches!(
                result,
                Err(TesseraError::Eviction(EvictionError::ScanUnsupported { .. }))
            ),
            "Expected scan-unsupported error, got {:?}",
            result
        );
    }
}
