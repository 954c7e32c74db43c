//! Trait definitions for evidence ledger storage services.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::domain::{AuditEvent, Digest, EvidenceBlob, TenantId};
use crate::scope::ScopedKey;

use super::Result;

/// Flat key-value backend over raw JSON rows keyed by scoped string.
///
/// Backends are tenant-agnostic: scoping happens in [`super::TenantStore`]
/// before any key reaches this layer, so a backend never sees an unscoped
/// identifier.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait KeyValueBackend: Send + Sync {
    /// Upsert a record under a scoped key.
    async fn put(&self, key: &ScopedKey, record: serde_json::Value) -> Result<()>;

    /// Fetch the record stored under a scoped key, if any.
    async fn get(&self, key: &ScopedKey) -> Result<Option<serde_json::Value>>;

    /// Enumerate the scoped keys starting with a prefix, in sorted order.
    async fn list_keys(&self, prefix: &str) -> Result<Vec<ScopedKey>>;

    /// Remove a record; absent keys are not an error.
    async fn delete(&self, key: &ScopedKey) -> Result<()>;
}

/// Append-only storage for per-entity audit chains.
///
/// Invariant: events for a given (tenant, entity) are returned in append
/// order, and nothing is ever updated or deleted.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Persist a new event at the end of an entity's chain.
    async fn append_event(
        &self,
        tenant_id: &TenantId,
        entity_id: &str,
        event: &AuditEvent,
    ) -> Result<()>;

    /// The most recent event for an entity, if any.
    async fn head(&self, tenant_id: &TenantId, entity_id: &str) -> Result<Option<AuditEvent>>;

    /// All events for an entity in append order.
    async fn list(&self, tenant_id: &TenantId, entity_id: &str) -> Result<Vec<AuditEvent>>;
}

/// Content-addressed storage for opaque byte content.
///
/// Blobs are keyed globally by digest, not per tenant; access control is the
/// evidence record layer's job.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes under their own digest.
    ///
    /// If metadata for that digest already exists, returns it unchanged
    /// (dedup short-circuit, no duplicate write). This holds for
    /// quarantined digests too: re-uploading the same content does not
    /// restore the servable bytes.
    async fn upload(&self, bytes: &[u8], content_type: &str) -> Result<EvidenceBlob>;

    /// Whether servable bytes exist for a digest. Quarantined blobs report
    /// `false`.
    async fn exists(&self, digest: &Digest) -> Result<bool>;

    /// Blob metadata for a digest, if any. Survives quarantine (the bytes
    /// are gone, the fact that they existed is not).
    async fn stat(&self, digest: &Digest) -> Result<Option<EvidenceBlob>>;

    /// Fetch the stored bytes; fails with `NotFound` when absent or
    /// quarantined.
    async fn download(&self, digest: &Digest) -> Result<Vec<u8>>;

    /// Move the bytes out of the servable path into quarantine. Metadata is
    /// kept for audit purposes.
    async fn quarantine(&self, digest: &Digest) -> Result<()>;

    /// Permanently remove bytes and metadata. Idempotent: deleting an
    /// already-absent blob is not an error.
    async fn delete(&self, digest: &Digest) -> Result<()>;
}
