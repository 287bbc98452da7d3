//! Identity types for Tessera cache keys

use crate::KeyError;
use sha2::{Digest, Sha256};

/// SHA-256 hash of a cache key.
pub type KeyHash = [u8; 32];

/// Separator between key segments.
pub const KEY_SEPARATOR: char = ':';

/// Namespace reserved for the organization marker in scoped keys.
pub const RESERVED_NAMESPACE: &str = "org";

/// Characters that SCAN MATCH would interpret as glob syntax.
const GLOB_METACHARACTERS: [char; 5] = ['*', '?', '[', ']', '\\'];

/// Compute SHA-256 hash of a cache key.
pub fn compute_key_hash(key: &str) -> KeyHash {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

/// Deterministic shard index for a key.
///
/// Uses the first eight bytes of the key hash. Not wired into tier routing.
pub fn shard_index(key: &str, shard_count: u32) -> u32 {
    if shard_count <= 1 {
        return 0;
    }
    let hash = compute_key_hash(key);
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&hash[0..8]);
    (u64::from_be_bytes(prefix) % u64::from(shard_count)) as u32
}

/// Validate a tenant, organization or namespace segment.
///
/// Segments must be non-empty and free of `:` and glob metacharacters so a
/// key can be split back into its scope unambiguously and used in a scan
/// pattern verbatim.
pub fn validate_segment(segment: &'static str, value: &str) -> Result<(), KeyError> {
    if value.is_empty() {
        return Err(KeyError::InvalidSegment {
            segment,
            value: value.to_string(),
            reason: "must not be empty".to_string(),
        });
    }
    if value.contains(KEY_SEPARATOR) {
        return Err(KeyError::InvalidSegment {
            segment,
            value: value.to_string(),
            reason: "must not contain ':'".to_string(),
        });
    }
    if let Some(c) = value.chars().find(|c| GLOB_METACHARACTERS.contains(c)) {
        return Err(KeyError::InvalidSegment {
            segment,
            value: value.to_string(),
            reason: format!("must not contain glob metacharacter {:?}", c),
        });
    }
    Ok(())
}

/// Validate a namespace name (a segment that is not the reserved `org` marker).
pub fn validate_namespace(namespace: &str) -> Result<(), KeyError> {
    validate_segment("namespace", namespace)?;
    if namespace == RESERVED_NAMESPACE {
        return Err(KeyError::InvalidSegment {
            segment: "namespace",
            value: namespace.to_string(),
            reason: "is reserved for organization scoping".to_string(),
        });
    }
    Ok(())
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(500))]

        /// Property: shard index is always within range and deterministic.
        #[test]
        fn prop_shard_index_in_range(key in ".{0,64}", shard_count in 1u32..1024) {
            let first = shard_index(&key, shard_count);
            let second = shard_index(&key, shard_count);
            prop_assert!(first < shard_count);
            prop_assert_eq!(first, second);
        }

        /// Property: any segment containing ':' is rejected.
        #[test]
        fn prop_separator_always_rejected(left in "[a-z]{0,8}", right in "[a-z]{0,8}") {
            let value = format!("{}:{}", left, right);
            prop_assert!(validate_segment("tenant", &value).is_err());
        }
    }
}
