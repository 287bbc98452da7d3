//! Tenant-scoped cache key builder.
//!
//! The key insight is that `TenantScopedKey`'s private inner struct makes a
//! tenant-less key UNCONSTRUCTIBLE. Every constructor validates the tenant
//! first and fails fast, because a malformed key is a tenant-isolation breach.
//!
//! # String Format
//!
//! ```text
//! tenant:<tenant>:org:<org>:<namespace>:<item_id>   (org-scoped)
//! tenant:<tenant>:<namespace>:<item_id>             (tenant-scoped)
//! tenant:<tenant>:<raw_key>                         (flat, non-namespaced)
//! ```
//!
//! The format is shared with data already stored by other services and must
//! not change. Injectivity over `(tenant, org, namespace, item_id)` follows
//! from the segment rules in [`tessera_core::validate_segment`]: tenant, org
//! and namespace never contain `:`, and the namespace `org` is reserved, so
//! the presence of the organization marker is always unambiguous. Item ids may
//! contain `:` since they are always the final component.

use std::fmt;

use tessera_core::{shard_index, validate_namespace, validate_segment, KeyError, RESERVED_NAMESPACE};

/// Literal prefix of every key.
const TENANT_MARKER: &str = "tenant:";

/// Marker introducing the organization segment.
const ORG_MARKER: &str = "org:";

/// A cache key that is scoped to a specific tenant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TenantScopedKey {
    /// Private inner data - cannot be constructed externally
    inner: TenantKeyInner,
}

/// Private inner struct - prevents external construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TenantKeyInner {
    tenant: String,
    org: Option<String>,
    body: KeyBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyBody {
    Namespaced { namespace: String, item_id: String },
    Flat { raw: String },
}

/// The `(tenant, org)` scope recovered from an encoded key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyScope {
    pub tenant: String,
    pub org: Option<String>,
}

impl TenantScopedKey {
    /// Create a namespaced key.
    ///
    /// An empty organization is treated as absent.
    ///
    /// # Errors
    ///
    /// - [`KeyError::MissingTenant`] when `tenant` is empty
    /// - [`KeyError::MissingNamespace`] / [`KeyError::MissingItemId`] for empty parts
    /// - [`KeyError::InvalidSegment`] when a segment breaks the format rules
    pub fn new(
        tenant: &str,
        org: Option<&str>,
        namespace: &str,
        item_id: &str,
    ) -> Result<Self, KeyError> {
        let tenant = checked_tenant(tenant)?;
        let org = checked_org(org)?;

        if namespace.is_empty() {
            return Err(KeyError::MissingNamespace);
        }
        validate_namespace(namespace)?;

        if item_id.is_empty() {
            return Err(KeyError::MissingItemId);
        }

        Ok(Self {
            inner: TenantKeyInner {
                tenant,
                org,
                body: KeyBody::Namespaced {
                    namespace: namespace.to_string(),
                    item_id: item_id.to_string(),
                },
            },
        })
    }

    /// Create a flat, non-namespaced key `tenant:<tenant>:<raw_key>`.
    ///
    /// Raw keys may not start with `org:`, which would make the key read back
    /// as organization-scoped.
    pub fn flat(tenant: &str, raw_key: &str) -> Result<Self, KeyError> {
        let tenant = checked_tenant(tenant)?;

        if raw_key.is_empty() {
            return Err(KeyError::InvalidSegment {
                segment: "raw_key",
                value: String::new(),
                reason: "must not be empty".to_string(),
            });
        }
        if raw_key.starts_with(ORG_MARKER) || raw_key == RESERVED_NAMESPACE {
            return Err(KeyError::InvalidSegment {
                segment: "raw_key",
                value: raw_key.to_string(),
                reason: "must not start with the organization marker".to_string(),
            });
        }

        Ok(Self {
            inner: TenantKeyInner {
                tenant,
                org: None,
                body: KeyBody::Flat {
                    raw: raw_key.to_string(),
                },
            },
        })
    }

    /// Get the tenant this key is scoped to.
    pub fn tenant(&self) -> &str {
        &self.inner.tenant
    }

    /// Get the organization, if the key is organization-scoped.
    pub fn org(&self) -> Option<&str> {
        self.inner.org.as_deref()
    }

    /// Get the namespace. `None` for flat keys.
    pub fn namespace(&self) -> Option<&str> {
        match &self.inner.body {
            KeyBody::Namespaced { namespace, .. } => Some(namespace),
            KeyBody::Flat { .. } => None,
        }
    }

    /// Get the item id. `None` for flat keys.
    pub fn item_id(&self) -> Option<&str> {
        match &self.inner.body {
            KeyBody::Namespaced { item_id, .. } => Some(item_id),
            KeyBody::Flat { .. } => None,
        }
    }

    /// Whether this is a flat (non-namespaced) key.
    pub fn is_flat(&self) -> bool {
        matches!(self.inner.body, KeyBody::Flat { .. })
    }

    /// Encode this key to its canonical storage string.
    pub fn encode(&self) -> String {
        let mut key = scope_prefix(&self.inner.tenant, self.inner.org.as_deref());
        match &self.inner.body {
            KeyBody::Namespaced { namespace, item_id } => {
                key.push_str(namespace);
                key.push(':');
                key.push_str(item_id);
            }
            KeyBody::Flat { raw } => key.push_str(raw),
        }
        key
    }

    /// The scope this key belongs to.
    pub fn scope(&self) -> KeyScope {
        KeyScope {
            tenant: self.inner.tenant.clone(),
            org: self.inner.org.clone(),
        }
    }

    /// Deterministic shard index of the encoded key.
    pub fn shard_index(&self, shard_count: u32) -> u32 {
        shard_index(&self.encode(), shard_count)
    }

    /// Extract `(tenant, org)` from an encoded key.
    ///
    /// Used by diagnostic and administrative tooling. Malformed keys are
    /// rejected rather than guessed at.
    pub fn decode_scope(key: &str) -> Result<KeyScope, KeyError> {
        let malformed = |reason: &str| KeyError::Malformed {
            key: key.to_string(),
            reason: reason.to_string(),
        };

        let rest = key
            .strip_prefix(TENANT_MARKER)
            .ok_or_else(|| malformed("missing 'tenant:' prefix"))?;

        let (tenant, rest) = rest
            .split_once(':')
            .ok_or_else(|| malformed("missing key body after tenant"))?;
        if tenant.trim().is_empty() {
            return Err(malformed("empty tenant"));
        }
        validate_segment("tenant", tenant).map_err(|e| malformed(&e.to_string()))?;
        if rest.is_empty() {
            return Err(malformed("empty key body"));
        }

        let org = match rest.strip_prefix(ORG_MARKER) {
            Some(after_marker) => {
                let (org, body) = after_marker
                    .split_once(':')
                    .ok_or_else(|| malformed("missing key body after organization"))?;
                if org.is_empty() {
                    return Err(malformed("empty organization"));
                }
                validate_segment("org", org).map_err(|e| malformed(&e.to_string()))?;
                if body.is_empty() {
                    return Err(malformed("empty key body"));
                }
                Some(org.to_string())
            }
            None if rest == RESERVED_NAMESPACE => {
                return Err(malformed("dangling organization marker"));
            }
            None => None,
        };

        Ok(KeyScope {
            tenant: tenant.to_string(),
            org,
        })
    }

    /// Glob pattern matching every key of one namespace within a scope:
    /// `tenant:<t>[:org:<o>]:<namespace>:*`.
    pub fn namespace_pattern(
        tenant: &str,
        org: Option<&str>,
        namespace: &str,
    ) -> Result<String, KeyError> {
        let tenant = checked_tenant(tenant)?;
        let org = checked_org(org)?;
        if namespace.is_empty() {
            return Err(KeyError::MissingNamespace);
        }
        validate_namespace(namespace)?;

        let mut pattern = scope_prefix(&tenant, org.as_deref());
        pattern.push_str(namespace);
        pattern.push_str(":*");
        Ok(pattern)
    }

    /// Glob pattern matching every key within a scope: `tenant:<t>[:org:<o>]:*`.
    ///
    /// A tenant-level pattern also matches that tenant's organization-scoped
    /// keys.
    pub fn scope_pattern(tenant: &str, org: Option<&str>) -> Result<String, KeyError> {
        let tenant = checked_tenant(tenant)?;
        let org = checked_org(org)?;
        let mut pattern = scope_prefix(&tenant, org.as_deref());
        pattern.push('*');
        Ok(pattern)
    }
}

impl fmt::Display for TenantScopedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

fn checked_tenant(tenant: &str) -> Result<String, KeyError> {
    if tenant.trim().is_empty() {
        return Err(KeyError::MissingTenant);
    }
    validate_segment("tenant", tenant)?;
    Ok(tenant.to_string())
}

fn checked_org(org: Option<&str>) -> Result<Option<String>, KeyError> {
    match org {
        None | Some("") => Ok(None),
        Some(org) => {
            validate_segment("org", org)?;
            Ok(Some(org.to_string()))
        }
    }
}

/// `tenant:<t>:` or `tenant:<t>:org:<o>:`
fn scope_prefix(tenant: &str, org: Option<&str>) -> String {
    let mut prefix = String::with_capacity(64);
    prefix.push_str(TENANT_MARKER);
    prefix.push_str(tenant);
    prefix.push(':');
    if let Some(org) = org {
        prefix.push_str(ORG_MARKER);
        prefix.push_str(org);
        prefix.push(':');
    }
    prefix
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_org_scoped_key_format() {
        let key = TenantScopedKey::new("acme", Some("org1"), "sessions", "42").unwrap();
        assert_eq!(key.encode(), "tenant:acme:org:org1:sessions:42");
        assert_eq!(key.tenant(), "acme");
        assert_eq!(key.org(), Some("org1"));
        assert_eq!(key.namespace(), Some("sessions"));
        assert_eq!(key.item_id(), Some("42"));
        assert!(!key.is_flat());
    }

    #[test]
    fn test_tenant_scoped_key_format() {
        let key = TenantScopedKey::new("acme", None, "permissions", "user-7").unwrap();
        assert_eq!(key.encode(), "tenant:acme:permissions:user-7");
        assert_eq!(key.to_string(), key.encode());
    }

    #[test]
    fn test_empty_org_is_absent() {
        let key = TenantScopedKey::new("acme", Some(""), "permissions", "1").unwrap();
        assert_eq!(key.org(), None);
        assert_eq!(key.encode(), "tenant:acme:permissions:1");
    }

    #[test]
    fn test_flat_key_format() {
        let key = TenantScopedKey::flat("acme", "feature-flags").unwrap();
        assert_eq!(key.encode(), "tenant:acme:feature-flags");
        assert!(key.is_flat());
        assert_eq!(key.namespace(), None);
        assert_eq!(key.item_id(), None);
    }

    #[test]
    fn test_item_id_may_contain_separator() {
        let key = TenantScopedKey::new("acme", None, "templates", "email:welcome").unwrap();
        assert_eq!(key.encode(), "tenant:acme:templates:email:welcome");
    }

    #[test]
    fn test_missing_tenant_rejected() {
        assert_eq!(
            TenantScopedKey::new("", Some("org1"), "sessions", "42"),
            Err(KeyError::MissingTenant)
        );
        assert_eq!(
            TenantScopedKey::new("   ", None, "sessions", "42"),
            Err(KeyError::MissingTenant)
        );
        assert_eq!(TenantScopedKey::flat("", "raw"), Err(KeyError::MissingTenant));
        assert_eq!(
            TenantScopedKey::namespace_pattern("", None, "sessions"),
            Err(KeyError::MissingTenant)
        );
        assert_eq!(
            TenantScopedKey::scope_pattern("", Some("org1")),
            Err(KeyError::MissingTenant)
        );
    }

    #[test]
    fn test_missing_parts_rejected() {
        assert_eq!(
            TenantScopedKey::new("acme", None, "", "42"),
            Err(KeyError::MissingNamespace)
        );
        assert_eq!(
            TenantScopedKey::new("acme", None, "sessions", ""),
            Err(KeyError::MissingItemId)
        );
        assert!(TenantScopedKey::flat("acme", "").is_err());
    }

    #[test]
    fn test_ambiguous_segments_rejected() {
        assert!(TenantScopedKey::new("ac:me", None, "sessions", "1").is_err());
        assert!(TenantScopedKey::new("acme", Some("o:1"), "sessions", "1").is_err());
        assert!(TenantScopedKey::new("acme", None, "org", "x:sessions:1").is_err());
        assert!(TenantScopedKey::new("acme", None, "sess*", "1").is_err());
        assert!(TenantScopedKey::flat("acme", "org:x:sessions:1").is_err());
        assert!(TenantScopedKey::flat("acme", "org").is_err());
    }

    #[test]
    fn test_decode_scope() {
        assert_eq!(
            TenantScopedKey::decode_scope("tenant:acme:org:org1:sessions:42").unwrap(),
            KeyScope {
                tenant: "acme".to_string(),
                org: Some("org1".to_string()),
            }
        );
        assert_eq!(
            TenantScopedKey::decode_scope("tenant:acme:sessions:42").unwrap(),
            KeyScope {
                tenant: "acme".to_string(),
                org: None,
            }
        );
        assert_eq!(
            TenantScopedKey::decode_scope("tenant:acme:feature-flags")
                .unwrap()
                .tenant,
            "acme"
        );
    }

    #[test]
    fn test_decode_scope_rejects_malformed() {
        for bad in [
            "",
            "acme:sessions:1",
            "tenant:",
            "tenant::sessions:1",
            "tenant:acme",
            "tenant:acme:",
            "tenant:acme:org",
            "tenant:acme:org:",
            "tenant:acme:org::sessions:1",
            "tenant:acme:org:org1",
            "tenant:acme:org:org1:",
            "tenant:ac*me:sessions:1",
            "tenant: :sessions:1",
        ] {
            let result = TenantScopedKey::decode_scope(bad);
            assert!(
                matches!(result, Err(KeyError::Malformed { .. })),
                "expected {:?} to be rejected, got {:?}",
                bad,
                result
            );
        }
    }

    #[test]
    fn test_namespace_pattern() {
        assert_eq!(
            TenantScopedKey::namespace_pattern("acme", Some("org1"), "sessions").unwrap(),
            "tenant:acme:org:org1:sessions:*"
        );
        assert_eq!(
            TenantScopedKey::namespace_pattern("acme", None, "sessions").unwrap(),
            "tenant:acme:sessions:*"
        );
    }

    #[test]
    fn test_scope_pattern() {
        assert_eq!(
            TenantScopedKey::scope_pattern("acme", Some("org1")).unwrap(),
            "tenant:acme:org:org1:*"
        );
        assert_eq!(
            TenantScopedKey::scope_pattern("acme", None).unwrap(),
            "tenant:acme:*"
        );
    }

    #[test]
    fn test_different_tenants_different_keys() {
        let key1 = TenantScopedKey::new("acme", None, "sessions", "1").unwrap();
        let key2 = TenantScopedKey::new("globex", None, "sessions", "1").unwrap();
        assert_ne!(key1.encode(), key2.encode());
    }

    #[test]
    fn test_org_and_tenant_scope_differ() {
        let scoped = TenantScopedKey::new("acme", Some("org1"), "sessions", "1").unwrap();
        let unscoped = TenantScopedKey::new("acme", None, "sessions", "1").unwrap();
        assert_ne!(scoped.encode(), unscoped.encode());
    }

    #[test]
    fn test_shard_index_within_range() {
        let key = TenantScopedKey::new("acme", Some("org1"), "sessions", "42").unwrap();
        assert!(key.shard_index(8) < 8);
        assert_eq!(key.shard_index(8), key.shard_index(8));
        assert_eq!(key.shard_index(1), 0);
    }
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;
    use tessera_test_utils::generators::{arb_item_id, arb_namespace, arb_org, arb_tenant};

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(1000))]

        /// Property: equal encodings imply equal tenant and organization.
        #[test]
        fn prop_encoding_is_injective(
            tenant1 in arb_tenant(),
            tenant2 in arb_tenant(),
            org1 in proptest::option::of(arb_org()),
            org2 in proptest::option::of(arb_org()),
            ns1 in arb_namespace(),
            ns2 in arb_namespace(),
            id1 in arb_item_id(),
            id2 in arb_item_id(),
        ) {
            let key1 = TenantScopedKey::new(&tenant1, org1.as_deref(), &ns1, &id1).unwrap();
            let key2 = TenantScopedKey::new(&tenant2, org2.as_deref(), &ns2, &id2).unwrap();

            if key1.encode() == key2.encode() {
                prop_assert_eq!(&tenant1, &tenant2);
                prop_assert_eq!(&org1, &org2);
                prop_assert_eq!(&ns1, &ns2);
                prop_assert_eq!(&id1, &id2);
            }
            if key1 != key2 {
                prop_assert_ne!(key1.encode(), key2.encode());
            }
        }

        /// Property: the scope decoded from an encoded key is the scope it was built with.
        #[test]
        fn prop_decode_scope_recovers_scope(
            tenant in arb_tenant(),
            org in proptest::option::of(arb_org()),
            ns in arb_namespace(),
            id in arb_item_id(),
        ) {
            let key = TenantScopedKey::new(&tenant, org.as_deref(), &ns, &id).unwrap();
            let scope = TenantScopedKey::decode_scope(&key.encode()).unwrap();
            prop_assert_eq!(scope, key.scope());
        }

        /// Property: an empty tenant is rejected for every other argument combination.
        #[test]
        fn prop_empty_tenant_always_rejected(
            org in proptest::option::of(".{0,12}"),
            ns in ".{0,12}",
            id in ".{0,12}",
        ) {
            prop_assert_eq!(
                TenantScopedKey::new("", org.as_deref(), &ns, &id),
                Err(KeyError::MissingTenant)
            );
            prop_assert_eq!(TenantScopedKey::flat("", &id), Err(KeyError::MissingTenant));
        }

        /// Property: every namespaced key matches the namespace pattern prefix of its scope.
        #[test]
        fn prop_namespace_pattern_is_prefix(
            tenant in arb_tenant(),
            org in proptest::option::of(arb_org()),
            ns in arb_namespace(),
            id in arb_item_id(),
        ) {
            let key = TenantScopedKey::new(&tenant, org.as_deref(), &ns, &id).unwrap();
            let pattern = TenantScopedKey::namespace_pattern(&tenant, org.as_deref(), &ns).unwrap();
            let prefix = pattern.trim_end_matches('*');
            prop_assert!(key.encode().starts_with(prefix));
        }
    }
}
