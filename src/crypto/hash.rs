//! Deterministic hashing for the audit ledger and blob store.
//!
//! - RFC 8785 JSON Canonicalization Scheme (JCS) for payload hashing
//! - A domain separation prefix for event chain hashes
//! - Raw SHA-256 over exact bytes for blob content addressing
//!
//! # Canonicalization
//!
//! Payload hashing uses `serde_json_canonicalizer` for RFC 8785 compliant
//! JSON canonicalization. Key properties:
//! - Deterministic key ordering (lexicographic UTF-8)
//! - ES6-compatible number serialization (handles floats, -0, etc.)
//! - Proper Unicode handling
//!
//! Any change to this canonicalization changes all future payload and event
//! hashes, so it is fixed here and nowhere else.

use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest as Sha2Digest, Sha256};

use crate::domain::{ActorId, Digest, EventType};

/// Domain prefix for audit event chain hashes.
///
/// Separates event hashes from payload hashes and from blob content digests,
/// so a value valid in one context can never be replayed in another.
pub const DOMAIN_EVENT: &[u8] = b"LEDGER_EVENT_V1";

/// Hash raw bytes with SHA-256.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Content digest of a blob: SHA-256 over the exact byte sequence received.
///
/// No normalization is applied. Two semantically-identical but byte-different
/// uploads (different line endings, encodings) produce different digests;
/// that is intentional.
pub fn content_digest(bytes: &[u8]) -> Digest {
    Digest::from_bytes(sha256(bytes))
}

/// Convert a JSON value to its canonical string representation per RFC 8785.
///
/// # Panics
///
/// Panics if the JSON value contains a float that cannot be represented
/// (NaN or Infinity). `serde_json::Number` cannot hold either, so this is
/// unreachable for values built through serde_json.
pub fn canonicalize_json(value: &serde_json::Value) -> String {
    serde_json_canonicalizer::to_string(value)
        .expect("Failed to canonicalize JSON - contains invalid values (NaN or Infinity)")
}

/// Compute the payload hash of an audit event.
///
/// `payload_hash = SHA256(JCS(payload))`
///
/// A pure function of the payload only: timestamp and actor do not
/// participate, so identical payloads always yield identical hashes
/// regardless of when or by whom they were recorded.
pub fn payload_hash(payload: &serde_json::Value) -> Digest {
    let canonical = canonicalize_json(payload);
    Digest::from_bytes(sha256(canonical.as_bytes()))
}

/// Fields committed to by an event hash.
pub struct EventHashParams<'a> {
    pub event_type: &'a EventType,
    pub payload_hash: &'a Digest,
    pub previous_event_hash: Option<&'a Digest>,
    pub timestamp: &'a DateTime<Utc>,
    pub actor_id: &'a ActorId,
}

/// Compute the chain hash of an audit event.
///
/// ```text
/// preimage = b"LEDGER_EVENT_V1" || JCS({
///     "actorId": actor_id,
///     "eventType": event_type,
///     "payloadHash": "sha256:<hex>",
///     "previousEventHash": "sha256:<hex>" | null,
///     "timestamp": RFC 3339 UTC, microsecond precision
/// })
///
/// event_hash = SHA256(preimage)
/// ```
///
/// Recomputing this from an event's stored fields must reproduce the stored
/// value exactly; that is the tamper-evidence check `verify_chain` performs.
pub fn compute_event_hash(params: &EventHashParams) -> Digest {
    let timestamp = params
        .timestamp
        .to_rfc3339_opts(SecondsFormat::Micros, true);

    let fields = serde_json::json!({
        "actorId": params.actor_id.as_str(),
        "eventType": params.event_type.as_str(),
        "payloadHash": params.payload_hash.to_string(),
        "previousEventHash": params.previous_event_hash.map(|d| d.to_string()),
        "timestamp": timestamp,
    });

    let canonical = canonicalize_json(&fields);

    let mut hasher = Sha256::new();
    hasher.update(DOMAIN_EVENT);
    hasher.update(canonical.as_bytes());
    Digest::from_bytes(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_content_digest_known_vector() {
        let d = content_digest(b"hello");
        assert_eq!(
            d.to_string(),
            "sha256:2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_content_digest_no_normalization() {
        // Byte-different but semantically equivalent inputs hash differently.
        let unix = content_digest(b"line one\nline two\n");
        let dos = content_digest(b"line one\r\nline two\r\n");
        assert_ne!(unix, dos);
    }

    #[test]
    fn test_canonical_json_key_ordering() {
        let value = json!({
            "zebra": 1,
            "apple": 2,
            "mango": 3
        });

        let canonical = canonicalize_json(&value);
        assert_eq!(canonical, r#"{"apple":2,"mango":3,"zebra":1}"#);
    }

    #[test]
    fn test_payload_hash_key_order_independence() {
        let value1 = json!({"b": 2, "a": 1});
        let value2 = json!({"a": 1, "b": 2});

        assert_eq!(payload_hash(&value1), payload_hash(&value2));
    }

    #[test]
    fn test_payload_hash_different_values() {
        assert_ne!(payload_hash(&json!({"v": 1})), payload_hash(&json!({"v": 2})));
    }

    #[test]
    fn test_event_hash_deterministic() {
        let ph = payload_hash(&json!({"name": "Acme Dialysis"}));
        let ts = chrono::DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let actor = ActorId::new("actor-1");
        let event_type = EventType::new("provider.created");

        let params = EventHashParams {
            event_type: &event_type,
            payload_hash: &ph,
            previous_event_hash: None,
            timestamp: &ts,
            actor_id: &actor,
        };

        assert_eq!(compute_event_hash(&params), compute_event_hash(&params));
    }

    #[test]
    fn test_event_hash_commits_to_predecessor() {
        let ph = payload_hash(&json!({}));
        let prev = content_digest(b"previous");
        let ts = Utc::now();
        let actor = ActorId::new("actor-1");
        let event_type = EventType::new("provider.updated");

        let first = compute_event_hash(&EventHashParams {
            event_type: &event_type,
            payload_hash: &ph,
            previous_event_hash: None,
            timestamp: &ts,
            actor_id: &actor,
        });
        let linked = compute_event_hash(&EventHashParams {
            event_type: &event_type,
            payload_hash: &ph,
            previous_event_hash: Some(&prev),
            timestamp: &ts,
            actor_id: &actor,
        });

        assert_ne!(first, linked);
    }

    #[test]
    fn test_event_hash_timestamp_participates() {
        let ph = payload_hash(&json!({"same": "payload"}));
        let actor = ActorId::new("actor-1");
        let event_type = EventType::new("provider.created");

        let t1 = chrono::DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let t2 = chrono::DateTime::parse_from_rfc3339("2026-01-01T00:00:01Z")
            .unwrap()
            .with_timezone(&Utc);

        let h1 = compute_event_hash(&EventHashParams {
            event_type: &event_type,
            payload_hash: &ph,
            previous_event_hash: None,
            timestamp: &t1,
            actor_id: &actor,
        });
        let h2 = compute_event_hash(&EventHashParams {
            event_type: &event_type,
            payload_hash: &ph,
            previous_event_hash: None,
            timestamp: &t2,
            actor_id: &actor,
        });

        // Same payload hash, different event hash.
        assert_ne!(h1, h2);
    }

    #[test]
    fn test_event_hash_sub_microsecond_precision_is_truncated() {
        let ph = payload_hash(&json!({}));
        let actor = ActorId::new("actor-1");
        let event_type = EventType::new("provider.created");

        // Differ only below microsecond precision; the preimage encodes
        // timestamps at microseconds, so the hashes match.
        let t1 = chrono::DateTime::parse_from_rfc3339("2026-01-01T00:00:00.000001000Z")
            .unwrap()
            .with_timezone(&Utc);
        let t2 = chrono::DateTime::parse_from_rfc3339("2026-01-01T00:00:00.000001999Z")
            .unwrap()
            .with_timezone(&Utc);

        let h1 = compute_event_hash(&EventHashParams {
            event_type: &event_type,
            payload_hash: &ph,
            previous_event_hash: None,
            timestamp: &t1,
            actor_id: &actor,
        });
        let h2 = compute_event_hash(&EventHashParams {
            event_type: &event_type,
            payload_hash: &ph,
            previous_event_hash: None,
            timestamp: &t2,
            actor_id: &actor,
        });

        assert_eq!(h1, h2);
    }
}
