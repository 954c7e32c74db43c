//! Property-based tests for scoping, digests, and canonical hashing.

use proptest::prelude::*;

use evidence_ledger::crypto::{canonicalize_json, content_digest, payload_hash};
use evidence_ledger::{Digest, TenantId, TenantScope};

prop_compose! {
    /// Tenant ids as the system accepts them: non-empty, no separator.
    fn arb_tenant()(s in "[a-z0-9-]{1,24}") -> TenantId {
        TenantId::from(s.as_str())
    }
}

proptest! {
    #[test]
    fn scope_unscope_roundtrips(tenant in arb_tenant(), logical in "[a-zA-Z0-9:._-]{1,40}") {
        let key = TenantScope::scope(&tenant, &logical).unwrap();
        prop_assert_eq!(TenantScope::unscope(&tenant, &key).unwrap(), logical);
        prop_assert!(TenantScope::owns(&tenant, &key));
    }

    #[test]
    fn foreign_tenants_never_unscope(
        tenant in arb_tenant(),
        other in arb_tenant(),
        logical in "[a-z0-9-]{1,40}",
    ) {
        prop_assume!(tenant != other);
        let key = TenantScope::scope(&tenant, &logical).unwrap();
        prop_assert!(TenantScope::unscope(&other, &key).is_err());
    }

    #[test]
    fn scoped_keys_fall_under_the_tenant_prefix(
        tenant in arb_tenant(),
        logical in "[a-z0-9-]{1,40}",
    ) {
        let key = TenantScope::scope(&tenant, &logical).unwrap();
        let prefix = TenantScope::prefix(&tenant).unwrap();
        prop_assert!(key.as_str().starts_with(&prefix));
    }

    #[test]
    fn digest_parse_accepts_both_forms(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        let digest = content_digest(&bytes);
        let canonical = digest.to_string();
        let bare = digest.to_hex();

        prop_assert_eq!(Digest::parse(&canonical).unwrap(), digest);
        prop_assert_eq!(Digest::parse(&bare).unwrap(), digest);
        prop_assert!(canonical.starts_with("sha256:"));
    }

    #[test]
    fn digest_is_injective_on_distinct_inputs(
        a in proptest::collection::vec(any::<u8>(), 0..128),
        b in proptest::collection::vec(any::<u8>(), 0..128),
    ) {
        prop_assume!(a != b);
        prop_assert_ne!(content_digest(&a), content_digest(&b));
    }

    #[test]
    fn payload_hash_is_stable_across_reserialization(
        keys in proptest::collection::btree_set("[a-z]{1,8}", 1..6),
        values in proptest::collection::vec(any::<i64>(), 6),
    ) {
        let object: serde_json::Map<String, serde_json::Value> = keys
            .iter()
            .zip(values.iter())
            .map(|(k, v)| (k.clone(), serde_json::json!(v)))
            .collect();
        let payload = serde_json::Value::Object(object);

        // Round-trip through text and hash again; canonicalization makes the
        // digest independent of any particular serialization.
        let reparsed: serde_json::Value =
            serde_json::from_str(&payload.to_string()).unwrap();
        prop_assert_eq!(payload_hash(&payload), payload_hash(&reparsed));
        prop_assert_eq!(canonicalize_json(&payload), canonicalize_json(&reparsed));
    }
}
