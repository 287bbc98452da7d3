//! Tessera Core - Shared Types
//!
//! Configuration, tier enum, key-segment rules and the error taxonomy shared
//! by every Tessera crate. This crate holds no I/O beyond reading a config
//! file; the cache itself lives in `tessera-storage`.

pub mod config;
pub mod enums;
pub mod error;
pub mod health;
pub mod identity;

pub use config::{CacheConfig, NamespacePolicy, RedisConfig, CONFIG_PATH_ENV};
pub use enums::{Tier, TierParseError};
pub use error::{
    ConfigError, EvictionError, KeyError, TesseraError, TesseraResult, TierError,
};
pub use health::{HealthStatus, TierHealth};
pub use identity::{
    compute_key_hash, shard_index, validate_namespace, validate_segment, KeyHash,
    KEY_SEPARATOR, RESERVED_NAMESPACE,
};
