//! Namespace policy resolution.
//!
//! Resolution never fails. Anything unconfigured falls back to a safe default:
//! unknown namespaces are enabled, have no TTL and use the global default tier.

use std::sync::Arc;
use std::time::Duration;

use tessera_core::{CacheConfig, NamespacePolicy, Tier};

/// Read-only view over the namespace policies of a [`CacheConfig`].
#[derive(Debug, Clone)]
pub struct PolicyRegistry {
    config: Arc<CacheConfig>,
}

impl PolicyRegistry {
    pub fn new(config: Arc<CacheConfig>) -> Self {
        Self { config }
    }

    /// The underlying configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Policy for a namespace, if one is configured.
    pub fn policy(&self, namespace: &str) -> Option<&NamespacePolicy> {
        self.config.namespaces.get(namespace)
    }

    /// Whether caching applies to a namespace.
    ///
    /// The global switch wins. Namespaces without a policy are enabled.
    pub fn is_namespace_enabled(&self, namespace: &str) -> bool {
        if !self.config.enabled {
            return false;
        }
        self.policy(namespace).map_or(true, |policy| policy.enabled)
    }

    /// Whether caching is globally enabled.
    pub fn is_globally_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Resolve the TTL for a write.
    ///
    /// Precedence: explicit, then the namespace default, then no expiry. A
    /// zero duration at either level means no expiry.
    pub fn resolve_ttl(&self, namespace: Option<&str>, explicit: Option<Duration>) -> Option<Duration> {
        if let Some(ttl) = explicit {
            return non_zero(ttl);
        }
        namespace
            .and_then(|ns| self.policy(ns))
            .and_then(|policy| policy.default_ttl_seconds)
            .map(Duration::from_secs)
            .and_then(non_zero)
    }

    /// Resolve the tier for an operation.
    ///
    /// Precedence: explicit, then the namespace preference, then the global
    /// default tier.
    pub fn resolve_tier(&self, namespace: Option<&str>, explicit: Option<Tier>) -> Tier {
        explicit
            .or_else(|| {
                namespace
                    .and_then(|ns| self.policy(ns))
                    .and_then(|policy| policy.preferred_tier)
            })
            .unwrap_or(self.config.default_tier)
    }
}

fn non_zero(ttl: Duration) -> Option<Duration> {
    if ttl.is_zero() {
        None
    } else {
        Some(ttl)
    }
}
