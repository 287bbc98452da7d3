//! Error types for Tessera operations

use crate::Tier;
use thiserror::Error;

/// Key construction and parsing errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("Tenant code is required to build a cache key")]
    MissingTenant,

    #[error("Namespace is required for a namespaced cache key")]
    MissingNamespace,

    #[error("Item id is required for a namespaced cache key")]
    MissingItemId,

    #[error("Invalid {segment} segment {value:?}: {reason}")]
    InvalidSegment {
        segment: &'static str,
        value: String,
        reason: String,
    },

    #[error("Malformed cache key {key:?}: {reason}")]
    Malformed { key: String, reason: String },
}

/// Storage tier errors.
///
/// These never reach callers of the cache-aside path: the orchestrator turns
/// them into misses, `false` or absent keys.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TierError {
    #[error("{tier} tier unavailable: {reason}")]
    Unavailable { tier: Tier, reason: String },

    #[error("{tier} tier {op} failed: {reason}")]
    Command {
        tier: Tier,
        op: &'static str,
        reason: String,
    },

    #[error("Serialization error: {reason}")]
    Serialization { reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Failed to parse {format} config: {reason}")]
    Parse { format: &'static str, reason: String },

    #[error("Unsupported config format for {path} (expected .json, .toml, .yaml or .yml)")]
    UnsupportedFormat { path: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Bulk eviction errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EvictionError {
    #[error("Namespace {namespace:?} is pinned to the {tier} tier, which cannot be scanned")]
    ScanUnsupported { namespace: String, tier: Tier },
}

/// Master error type for all Tessera errors.
#[derive(Debug, Clone, Error)]
pub enum TesseraError {
    #[error("Key error: {0}")]
    Key(#[from] KeyError),

    #[error("Tier error: {0}")]
    Tier(#[from] TierError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Eviction error: {0}")]
    Eviction(#[from] EvictionError),
}

/// Result type alias for Tessera operations.
pub type TesseraResult<T> = Result<T, TesseraError>;

// =============================================================================
// TESTS
// =============================================================================
