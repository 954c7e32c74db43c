//! Evidence blob metadata and tenant-scoped evidence records.
//!
//! An `EvidenceBlob` is keyed globally by its content digest: identical
//! bytes from any tenant resolve to the same blob and the same physical
//! path. An `EvidenceRecord` is the tenant-owned, human-meaningful side:
//! many records (possibly across tenants) may reference one blob, and
//! access to a blob is always mediated by a record lookup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scope::ScopedKey;

use super::{ActorId, Digest, TenantId};

/// Metadata for stored binary content, keyed globally by `content_hash`.
///
/// Created on first upload of a given digest, never mutated, deleted only
/// via explicit delete. Quarantine removes the servable bytes but keeps
/// this metadata for audit purposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceBlob {
    /// Content digest; the blob's identity and storage address.
    pub content_hash: Digest,

    /// MIME type declared at upload time.
    pub content_type: String,

    /// Exact size of the stored bytes.
    pub size_bytes: u64,

    /// When the bytes were first stored.
    pub uploaded_at: DateTime<Utc>,

    /// Path of the servable bytes relative to the store root.
    pub storage_path: String,
}

/// Tenant-scoped record binding a named document to a blob digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceRecord {
    /// Tenant-scoped record identifier.
    pub id: ScopedKey,

    /// Owning tenant.
    pub tenant_id: TenantId,

    /// Provider the evidence belongs to.
    pub provider_id: String,

    /// Facility the evidence belongs to.
    pub facility_id: String,

    /// Digest of the referenced blob. The blob must exist when the record
    /// is created; if it is later quarantined or deleted, the record stays
    /// queryable and the blob fetch fails distinctly.
    pub content_hash: Digest,

    /// Declared evidence category (policy, inspection-report, etc.)
    pub evidence_type: String,

    /// Original file name as uploaded.
    pub file_name: String,

    /// Optional free-form description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Copied from the blob at record creation for join-free querying.
    pub content_type: String,

    /// Copied from the blob at record creation for join-free querying.
    pub size_bytes: u64,

    /// When the record was created.
    pub uploaded_at: DateTime<Utc>,

    /// Actor who created the record.
    pub created_by: ActorId,
}

/// Caller-supplied fields for creating an evidence record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEvidenceRecord {
    pub provider_id: String,
    pub facility_id: String,
    pub content_hash: Digest,
    pub evidence_type: String,
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
