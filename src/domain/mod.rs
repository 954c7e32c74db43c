//! Core domain types for the evidence ledger.
//!
//! These are the structures the rest of the crate moves around: tenant
//! identity, content digests, audit events, and evidence records.

mod event;
mod evidence;
mod types;

pub use event::AuditEvent;
pub use evidence::{EvidenceBlob, EvidenceRecord, NewEvidenceRecord};
pub use types::{ActorId, Digest, DigestParseError, EventType, TenantContext, TenantId};
