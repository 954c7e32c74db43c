//! Audit event structure for the hash-chained ledger.
//!
//! Events are grouped by an opaque entity id and ordered by append time.
//! Each event commits to the digest of the previous event for the same
//! entity, forming a verifiable chain. Events are immutable once appended:
//! no operation in the public contract alters a stored event, and even blob
//! quarantine/deletion is recorded as a new event rather than a retraction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::{compute_event_hash, EventHashParams};
use crate::scope::ScopedKey;

use super::{ActorId, Digest, EventType};

/// A single entry in a per-entity audit chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Tenant-scoped event identifier.
    pub event_id: ScopedKey,

    /// Event classification (provider.created, evidence.recorded, etc.)
    pub event_type: EventType,

    /// When the event was appended (assigned by the ledger, not the caller).
    pub timestamp: DateTime<Utc>,

    /// Actor who caused the event.
    pub actor_id: ActorId,

    /// SHA-256 over the canonical JSON of the payload. A pure function of
    /// the payload only, enabling cross-checks without exposing payloads.
    pub payload_hash: Digest,

    /// The previous event's `event_hash` for this entity; absent for the
    /// first event in a chain. Chains for different entities never
    /// cross-reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_event_hash: Option<Digest>,

    /// SHA-256 over `{event_type, payload_hash, previous_event_hash,
    /// timestamp, actor_id}`. Recomputable from stored fields.
    pub event_hash: Digest,
}

impl AuditEvent {
    /// Recompute the chain hash from this event's stored fields.
    pub fn recompute_event_hash(&self) -> Digest {
        compute_event_hash(&EventHashParams {
            event_type: &self.event_type,
            payload_hash: &self.payload_hash,
            previous_event_hash: self.previous_event_hash.as_ref(),
            timestamp: &self.timestamp,
            actor_id: &self.actor_id,
        })
    }

    /// Whether the stored `event_hash` matches a fresh recomputation.
    pub fn verify_hash(&self) -> bool {
        self.recompute_event_hash() == self.event_hash
    }
}
