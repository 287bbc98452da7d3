//! Command implementations.
//!
//! Every command renders a JSON value; `main` prints it.

use std::sync::Arc;

use serde_json::{json, Value};
use tessera_core::{CacheConfig, RedisConfig};
use tessera_storage::{LocalTier, PolicyRegistry, RedisTier, TenantCache, TenantScopedKey};

use crate::args::EvictTarget;
use crate::CliError;

/// Decode the scope and shard of each key. Malformed keys are reported
/// inline; the second value is whether any key was malformed.
pub fn inspect(config: &CacheConfig, keys: &[String]) -> (Value, bool) {
    let mut any_malformed = false;
    let rows: Vec<Value> = keys
        .iter()
        .map(|key| match TenantScopedKey::decode_scope(key) {
            Ok(scope) => json!({
                "key": key,
                "tenant": scope.tenant,
                "org": scope.org,
                "shard": tessera_core::shard_index(key, config.shard_count),
            }),
            Err(e) => {
                any_malformed = true;
                json!({ "key": key, "error": e.to_string() })
            }
        })
        .collect();
    (Value::Array(rows), any_malformed)
}

/// Resolve the effective policy of each namespace.
pub fn policy(config: Arc<CacheConfig>, namespaces: &[String]) -> Value {
    let registry = PolicyRegistry::new(config);
    let rows: Vec<Value> = namespaces
        .iter()
        .map(|namespace| {
            json!({
                "namespace": namespace,
                "configured": registry.policy(namespace).is_some(),
                "enabled": registry.is_namespace_enabled(namespace),
                "ttl_secs": registry.resolve_ttl(Some(namespace), None).map(|ttl| ttl.as_secs()),
                "tier": registry.resolve_tier(Some(namespace), None),
            })
        })
        .collect();
    Value::Array(rows)
}

/// Shard index of each key under the configured shard count.
pub fn shard(config: &CacheConfig, keys: &[String]) -> Value {
    let rows: Vec<Value> = keys
        .iter()
        .map(|key| {
            json!({
                "key": key,
                "shard": tessera_core::shard_index(key, config.shard_count),
                "shard_count": config.shard_count,
            })
        })
        .collect();
    Value::Array(rows)
}

/// Build a cache over Redis for administrative commands.
pub fn redis_cache(config: Arc<CacheConfig>, redis: &RedisConfig) -> Result<TenantCache, CliError> {
    let tier = RedisTier::connect(redis).map_err(tessera_core::TesseraError::from)?;
    Ok(TenantCache::new(config, Arc::new(LocalTier::new()), Arc::new(tier)))
}

/// Run a bulk eviction and render its report.
pub async fn evict(
    cache: &TenantCache,
    tenant: &str,
    org: Option<&str>,
    target: &EvictTarget,
) -> Result<Value, CliError> {
    let report = match target {
        EvictTarget::Namespace(namespace) => cache.evict_namespace(tenant, org, namespace).await?,
        EvictTarget::Scope => cache.evict_scope(tenant, org).await?,
    };
    Ok(serde_json::to_value(&report)?)
}

/// Probe both tiers. The second value is whether every tier is healthy.
pub async fn health(cache: &TenantCache) -> Result<(Value, bool), CliError> {
    let report = cache.health().await;
    let healthy = report.iter().all(|tier| tier.is_healthy());
    Ok((serde_json::to_value(&report)?, healthy))
}
