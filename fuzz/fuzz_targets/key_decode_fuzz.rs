//! Fuzz test for the cache key scope parser
//!
//! Feeds arbitrary strings to `TenantScopedKey::decode_scope` looking for
//! panics and for accepted keys whose scope does not rebuild the same prefix.
//!
//! Run with: cargo +nightly fuzz run key_decode_fuzz -- -max_total_time=60

#![no_main]

use libfuzzer_sys::fuzz_target;
use tessera_storage::TenantScopedKey;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    let Ok(scope) = TenantScopedKey::decode_scope(input) else {
        return;
    };

    // An accepted key must start with the pattern prefix of its own scope
    let pattern = TenantScopedKey::scope_pattern(&scope.tenant, scope.org.as_deref())
        .expect("decoded scope must be a valid scope");
    let prefix = pattern.trim_end_matches('*');
    assert!(
        input.starts_with(prefix),
        "key {:?} does not start with its scope prefix {:?}",
        input,
        prefix
    );
    assert!(input.len() > prefix.len(), "key {:?} has an empty body", input);
});
