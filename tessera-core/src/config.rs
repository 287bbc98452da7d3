//! Configuration types
//!
//! `CacheConfig` is built once at process start (from a file, the
//! environment, or code) and passed into the cache by reference. Nothing in
//! the workspace mutates it afterward.

use crate::{validate_namespace, ConfigError, Tier};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Environment variable naming a config file to load before overrides.
pub const CONFIG_PATH_ENV: &str = "TESSERA_CACHE_CONFIG";

const ENV_PREFIX: &str = "TESSERA_CACHE_";
const NAMESPACE_ENV_PREFIX: &str = "TESSERA_CACHE_NS_";

/// Per-namespace cache policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespacePolicy {
    /// Whether caching is enabled for this namespace.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Default TTL in seconds. Unset (or zero) means no expiry.
    #[serde(default, alias = "default_ttl_seconds")]
    pub default_ttl_seconds: Option<u64>,

    /// Preferred tier. Unset falls back to `CacheConfig::default_tier`.
    #[serde(default, alias = "preferred_tier")]
    pub preferred_tier: Option<Tier>,
}

impl Default for NamespacePolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            default_ttl_seconds: None,
            preferred_tier: None,
        }
    }
}

impl NamespacePolicy {
    /// Create an enabled policy with no TTL and the global default tier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default TTL in seconds.
    pub fn with_ttl_secs(mut self, secs: u64) -> Self {
        self.default_ttl_seconds = Some(secs);
        self
    }

    /// Set the preferred tier.
    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.preferred_tier = Some(tier);
        self
    }

    /// Enable or disable caching for the namespace.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Process-wide cache configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheConfig {
    /// Global kill switch. When false every namespace is bypassed.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Number of logical shards used to compute `shard_index` for a key.
    #[serde(default = "default_shard_count", alias = "shard_count")]
    pub shard_count: u32,

    /// Policies keyed by namespace name.
    #[serde(default)]
    pub namespaces: BTreeMap<String, NamespacePolicy>,

    /// Keys requested per SCAN page during bulk eviction.
    #[serde(default = "default_scan_batch_size", alias = "scan_batch_size")]
    pub scan_batch_size: usize,

    /// Capacity of the cache event broadcast channel.
    #[serde(default = "default_event_capacity", alias = "event_capacity")]
    pub event_capacity: usize,

    /// Tier used when neither the call nor the namespace names one.
    #[serde(default, alias = "default_tier")]
    pub default_tier: Tier,
}

fn default_enabled() -> bool {
    true
}

fn default_shard_count() -> u32 {
    1
}

fn default_scan_batch_size() -> usize {
    1000
}

fn default_event_capacity() -> usize {
    256
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            shard_count: default_shard_count(),
            namespaces: BTreeMap::new(),
            scan_batch_size: default_scan_batch_size(),
            event_capacity: default_event_capacity(),
            default_tier: Tier::default(),
        }
    }
}

impl CacheConfig {
    /// Create a config with default values and no namespaces.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a namespace policy.
    pub fn with_namespace(mut self, name: impl Into<String>, policy: NamespacePolicy) -> Self {
        self.namespaces.insert(name.into(), policy);
        self
    }

    /// Enable or disable caching globally.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the shard count.
    pub fn with_shard_count(mut self, shard_count: u32) -> Self {
        self.shard_count = shard_count;
        self
    }

    /// Set the SCAN page size used by bulk eviction.
    pub fn with_scan_batch_size(mut self, size: usize) -> Self {
        self.scan_batch_size = size;
        self
    }

    /// Set the global default tier.
    pub fn with_default_tier(mut self, tier: Tier) -> Self {
        self.default_tier = tier;
        self
    }

    /// Parse a JSON document.
    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(input).map_err(|e| ConfigError::Parse {
            format: "json",
            reason: e.to_string(),
        })
    }

    /// Parse a TOML document.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        toml::from_str(input).map_err(|e| ConfigError::Parse {
            format: "toml",
            reason: e.to_string(),
        })
    }

    /// Parse a YAML document.
    pub fn from_yaml_str(input: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(input).map_err(|e| ConfigError::Parse {
            format: "yaml",
            reason: e.to_string(),
        })
    }

    /// Load a config file, choosing the format from its extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        let parse: fn(&str) -> Result<Self, ConfigError> = match extension.as_deref() {
            Some("json") => Self::from_json_str,
            Some("toml") => Self::from_toml_str,
            Some("yaml") | Some("yml") => Self::from_yaml_str,
            _ => return Err(ConfigError::UnsupportedFormat { path: display }),
        };

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: display,
            reason: e.to_string(),
        })?;
        let config = parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Build the config from the process environment.
    ///
    /// Environment variables:
    /// - `TESSERA_CACHE_CONFIG`: config file to load first (default: built-in defaults)
    /// - `TESSERA_CACHE_ENABLED`: "true"/"false" global switch
    /// - `TESSERA_CACHE_SHARD_COUNT`: shard count
    /// - `TESSERA_CACHE_SCAN_BATCH_SIZE`: SCAN page size
    /// - `TESSERA_CACHE_DEFAULT_TIER`: "local" or "distributed"
    /// - `TESSERA_CACHE_NS_<NAME>_ENABLED` / `_TTL_SECS` / `_TIER`: namespace policy
    ///
    /// `<NAME>` is the namespace upper-cased with `-` written as `_`, so
    /// `entity-types` is `ENTITY_TYPES`. A name that matches no configured
    /// namespace creates one named by lower-casing `<NAME>`: the override
    /// above would create `entity_types`. Hyphenated namespaces must be
    /// declared in the config file before the environment can tune them.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_path(path.trim())?,
            _ => Self::default(),
        };
        base.apply_overrides(std::env::vars())
    }

    /// Apply `TESSERA_CACHE_*` overrides from an iterator of (name, value) pairs.
    ///
    /// Unrelated variables are ignored. Namespace overrides for a name that is
    /// not configured create a new, lower-cased policy entry (see
    /// [`CacheConfig::from_env`] for the name mapping).
    pub fn apply_overrides<I, K, V>(mut self, vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (name, value) in vars {
            let name = name.as_ref();
            let value = value.as_ref().trim();

            if name == CONFIG_PATH_ENV {
                continue;
            }

            if let Some(rest) = name.strip_prefix(NAMESPACE_ENV_PREFIX) {
                self.apply_namespace_override(name, rest, value)?;
                continue;
            }

            match name.strip_prefix(ENV_PREFIX) {
                Some("ENABLED") => self.enabled = parse_bool(name, value)?,
                Some("SHARD_COUNT") => self.shard_count = parse_number(name, value)?,
                Some("SCAN_BATCH_SIZE") => self.scan_batch_size = parse_number(name, value)?,
                Some("EVENT_CAPACITY") => self.event_capacity = parse_number(name, value)?,
                Some("DEFAULT_TIER") => self.default_tier = parse_tier(name, value)?,
                _ => {}
            }
        }

        self.validate()?;
        Ok(self)
    }

    fn apply_namespace_override(
        &mut self,
        var: &str,
        rest: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let (env_name, field) = if let Some(ns) = rest.strip_suffix("_TTL_SECS") {
            (ns, "TTL_SECS")
        } else if let Some(ns) = rest.strip_suffix("_ENABLED") {
            (ns, "ENABLED")
        } else if let Some(ns) = rest.strip_suffix("_TIER") {
            (ns, "TIER")
        } else {
            return Ok(());
        };

        if env_name.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: var.to_string(),
                value: value.to_string(),
                reason: "missing namespace name".to_string(),
            });
        }

        let namespace = self
            .namespaces
            .keys()
            .find(|existing| env_key(existing) == env_name)
            .cloned()
            .unwrap_or_else(|| env_name.to_ascii_lowercase());
        let policy = self.namespaces.entry(namespace).or_default();

        match field {
            "TTL_SECS" => {
                let secs: u64 = parse_number(var, value)?;
                policy.default_ttl_seconds = (secs > 0).then_some(secs);
            }
            "ENABLED" => policy.enabled = parse_bool(var, value)?,
            _ => policy.preferred_tier = Some(parse_tier(var, value)?),
        }
        Ok(())
    }

    /// Check invariants that deserialization alone cannot enforce.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.shard_count == 0 {
            return Err(invalid("shard_count", "0", "must be at least 1"));
        }
        if self.scan_batch_size == 0 {
            return Err(invalid("scan_batch_size", "0", "must be at least 1"));
        }
        if self.event_capacity == 0 {
            return Err(invalid("event_capacity", "0", "must be at least 1"));
        }
        for name in self.namespaces.keys() {
            validate_namespace(name).map_err(|e| ConfigError::InvalidValue {
                field: "namespaces".to_string(),
                value: name.clone(),
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }
}

/// Connection settings for the Redis-backed distributed tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL (e.g., "redis://localhost:6379")
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Connection pool size
    #[serde(default = "default_redis_pool_size")]
    pub pool_size: usize,

    /// Pool wait/create/recycle timeout in milliseconds
    #[serde(default = "default_redis_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_redis_pool_size() -> usize {
    10
}

fn default_redis_timeout_ms() -> u64 {
    5000
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            pool_size: default_redis_pool_size(),
            timeout_ms: default_redis_timeout_ms(),
        }
    }
}

impl RedisConfig {
    /// Create RedisConfig from environment variables.
    ///
    /// Environment variables:
    /// - `TESSERA_REDIS_URL` (default: redis://localhost:6379)
    /// - `TESSERA_REDIS_POOL_SIZE` (default: 10)
    /// - `TESSERA_REDIS_TIMEOUT_MS` (default: 5000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            url: std::env::var("TESSERA_REDIS_URL").unwrap_or(defaults.url),
            pool_size: std::env::var("TESSERA_REDIS_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.pool_size),
            timeout_ms: std::env::var("TESSERA_REDIS_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.timeout_ms),
        }
    }
}

fn env_key(namespace: &str) -> String {
    namespace.to_ascii_uppercase().replace('-', "_")
}

fn invalid(field: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_bool(field: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(invalid(field, value, "expected true or false")),
    }
}

fn parse_number<T: std::str::FromStr>(field: &str, value: &str) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| invalid(field, value, "expected a non-negative integer"))
}

fn parse_tier(field: &str, value: &str) -> Result<Tier, ConfigError> {
    value.parse().map_err(|e: crate::TierParseError| ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_JSON: &str = r#"{
        "enabled": true,
        "shardCount": 8,
        "namespaces": {
            "sessions": { "enabled": true, "defaultTtlSeconds": 86400, "preferredTier": "distributed" },
            "permissions": { "preferredTier": "local" },
            "templates": { "enabled": false }
        }
    }"#;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert!(config.enabled);
        assert_eq!(config.shard_count, 1);
        assert!(config.namespaces.is_empty());
        assert_eq!(config.scan_batch_size, 1000);
        assert_eq!(config.event_capacity, 256);
        assert_eq!(config.default_tier, Tier::Distributed);
    }

    #[test]
    fn test_from_json_str() {
        let config = CacheConfig::from_json_str(SAMPLE_JSON).unwrap();
        assert_eq!(config.shard_count, 8);
        assert_eq!(config.namespaces.len(), 3);

        let sessions = &config.namespaces["sessions"];
        assert!(sessions.enabled);
        assert_eq!(sessions.default_ttl_seconds, Some(86400));
        assert_eq!(sessions.preferred_tier, Some(Tier::Distributed));

        let permissions = &config.namespaces["permissions"];
        assert!(permissions.enabled);
        assert_eq!(permissions.default_ttl_seconds, None);
        assert_eq!(permissions.preferred_tier, Some(Tier::Local));

        assert!(!config.namespaces["templates"].enabled);
        assert_eq!(config.scan_batch_size, 1000);
    }

    #[test]
    fn test_from_toml_str_accepts_snake_case() {
        let config = CacheConfig::from_toml_str(
            r#"
            enabled = true
            shard_count = 4
            scan_batch_size = 50

            [namespaces.mentor]
            default_ttl_seconds = 600
            preferred_tier = "local"
            "#,
        )
        .unwrap();
        assert_eq!(config.shard_count, 4);
        assert_eq!(config.scan_batch_size, 50);
        let mentor = &config.namespaces["mentor"];
        assert_eq!(mentor.default_ttl_seconds, Some(600));
        assert_eq!(mentor.preferred_tier, Some(Tier::Local));
    }

    #[test]
    fn test_from_yaml_str() {
        let config = CacheConfig::from_yaml_str(
            "enabled: false\nnamespaces:\n  sessions:\n    defaultTtlSeconds: 60\n",
        )
        .unwrap();
        assert!(!config.enabled);
        assert_eq!(config.namespaces["sessions"].default_ttl_seconds, Some(60));
    }

    #[test]
    fn test_parse_error_reports_format() {
        let err = CacheConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { format: "json", .. }));
    }

    #[test]
    fn test_from_path_unsupported_extension() {
        let err = CacheConfig::from_path("cache.ini").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_from_path_missing_file() {
        let err = CacheConfig::from_path("/nonexistent/tessera/cache.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_apply_global_overrides() {
        let config = CacheConfig::default()
            .apply_overrides([
                ("TESSERA_CACHE_ENABLED", "false"),
                ("TESSERA_CACHE_SHARD_COUNT", "16"),
                ("TESSERA_CACHE_SCAN_BATCH_SIZE", "200"),
                ("TESSERA_CACHE_DEFAULT_TIER", "local"),
                ("PATH", "/usr/bin"),
            ])
            .unwrap();
        assert!(!config.enabled);
        assert_eq!(config.shard_count, 16);
        assert_eq!(config.scan_batch_size, 200);
        assert_eq!(config.default_tier, Tier::Local);
    }

    #[test]
    fn test_apply_namespace_overrides() {
        let config = CacheConfig::from_json_str(SAMPLE_JSON)
            .unwrap()
            .with_namespace("entity-types", NamespacePolicy::new())
            .apply_overrides([
                ("TESSERA_CACHE_NS_SESSIONS_TTL_SECS", "120"),
                ("TESSERA_CACHE_NS_TEMPLATES_ENABLED", "true"),
                ("TESSERA_CACHE_NS_ENTITY_TYPES_TIER", "local"),
                ("TESSERA_CACHE_NS_NOTIFICATIONS_TTL_SECS", "30"),
            ])
            .unwrap();

        assert_eq!(config.namespaces["sessions"].default_ttl_seconds, Some(120));
        assert!(config.namespaces["templates"].enabled);
        assert_eq!(
            config.namespaces["entity-types"].preferred_tier,
            Some(Tier::Local)
        );
        assert_eq!(
            config.namespaces["notifications"].default_ttl_seconds,
            Some(30)
        );
    }

    #[test]
    fn test_unconfigured_override_creates_underscored_namespace() {
        let config = CacheConfig::new()
            .apply_overrides([("TESSERA_CACHE_NS_ENTITY_TYPES_TTL_SECS", "60")])
            .unwrap();

        assert_eq!(
            config.namespaces["entity_types"].default_ttl_seconds,
            Some(60)
        );
        assert!(!config.namespaces.contains_key("entity-types"));

        let declared = CacheConfig::new()
            .with_namespace("entity-types", NamespacePolicy::new())
            .apply_overrides([("TESSERA_CACHE_NS_ENTITY_TYPES_TTL_SECS", "60")])
            .unwrap();
        assert_eq!(declared.namespaces.len(), 1);
        assert_eq!(
            declared.namespaces["entity-types"].default_ttl_seconds,
            Some(60)
        );
    }

    #[test]
    fn test_zero_ttl_override_clears_expiry() {
        let config = CacheConfig::from_json_str(SAMPLE_JSON)
            .unwrap()
            .apply_overrides([("TESSERA_CACHE_NS_SESSIONS_TTL_SECS", "0")])
            .unwrap();
        assert_eq!(config.namespaces["sessions"].default_ttl_seconds, None);
    }

    #[test]
    fn test_invalid_override_value() {
        let err = CacheConfig::default()
            .apply_overrides([("TESSERA_CACHE_SHARD_COUNT", "many")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let err = CacheConfig::default()
            .apply_overrides([("TESSERA_CACHE_NS_SESSIONS_TIER", "disk")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        assert!(CacheConfig::default().with_shard_count(0).validate().is_err());
        assert!(CacheConfig::default()
            .with_scan_batch_size(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_validate_rejects_bad_namespace_names() {
        let config = CacheConfig::default().with_namespace("org", NamespacePolicy::new());
        assert!(config.validate().is_err());

        let config = CacheConfig::default().with_namespace("a:b", NamespacePolicy::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_redis_config_defaults() {
        let config: RedisConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, RedisConfig::default());
        assert_eq!(config.url, "redis://localhost:6379");
        assert_eq!(config.pool_size, 10);
        assert_eq!(config.timeout_ms, 5000);
    }
}
