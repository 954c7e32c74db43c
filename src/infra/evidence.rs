//! Evidence record layer.
//!
//! Binds tenant-owned, human-meaningful records to globally content-addressed
//! blobs. The layer never duplicates bytes, only references them by digest,
//! and it is the ownership gate over the shared blob store: blobs are
//! addressed globally, but access stays tenant-scoped through
//! [`EvidenceService::find_by_content_hash`].

use std::sync::Arc;

use serde_json::json;
use tracing::{instrument, warn};

use crate::domain::{
    Digest, EventType, EvidenceRecord, NewEvidenceRecord, TenantContext,
};
use crate::scope::TenantScope;

use super::{
    AuditLedger, BlobStore, IdGenerator, KeyValueBackend, Result, StoreError, TenantStore,
};

/// Service composing the tenant-isolated record store, the shared blob
/// store, and the audit ledger.
pub struct EvidenceService {
    records: TenantStore<EvidenceRecord>,
    blobs: Arc<dyn BlobStore>,
    ledger: Arc<AuditLedger>,
    ids: IdGenerator,
}

impl EvidenceService {
    pub fn new(
        backend: Arc<dyn KeyValueBackend>,
        blobs: Arc<dyn BlobStore>,
        ledger: Arc<AuditLedger>,
    ) -> Self {
        Self {
            records: TenantStore::new(backend),
            blobs,
            ledger,
            ids: IdGenerator::new("evidence"),
        }
    }

    /// The underlying blob store, for direct uploads.
    ///
    /// Uploads are not tenant-gated: bytes carry no ownership until a record
    /// references them.
    pub fn blobs(&self) -> &Arc<dyn BlobStore> {
        &self.blobs
    }

    /// Create an evidence record referencing an already-uploaded blob.
    ///
    /// Fails with `BlobNotFound` when no blob metadata exists for the
    /// digest; callers must upload first. Quarantined digests are accepted
    /// (the record is a historical reference; downloading still fails).
    /// Copies `content_type` and `size_bytes` from the blob so queries need
    /// no join, and appends an `evidence.recorded` event to the provider's
    /// audit chain.
    #[instrument(skip(self, ctx, new), fields(tenant = %ctx.tenant_id, content_hash = %new.content_hash))]
    pub async fn create_record(
        &self,
        ctx: &TenantContext,
        new: NewEvidenceRecord,
    ) -> Result<EvidenceRecord> {
        let blob = self
            .blobs
            .stat(&new.content_hash)
            .await?
            .ok_or(StoreError::BlobNotFound(new.content_hash))?;

        let logical_id = self.ids.next(&ctx.tenant_id).await;
        let record = EvidenceRecord {
            id: TenantScope::scope(&ctx.tenant_id, &logical_id)?,
            tenant_id: ctx.tenant_id.clone(),
            provider_id: new.provider_id,
            facility_id: new.facility_id,
            content_hash: new.content_hash,
            evidence_type: new.evidence_type,
            file_name: new.file_name,
            description: new.description,
            content_type: blob.content_type,
            size_bytes: blob.size_bytes,
            uploaded_at: blob.uploaded_at,
            created_by: ctx.actor_id.clone(),
        };

        self.records.write(ctx, &logical_id, &record).await?;

        let appended = self
            .ledger
            .append(
                ctx,
                &record.provider_id,
                EventType::new(EventType::EVIDENCE_RECORDED),
                &json!({
                    "recordId": record.id,
                    "contentHash": record.content_hash,
                    "facilityId": record.facility_id,
                    "evidenceType": record.evidence_type,
                    "fileName": record.file_name,
                }),
            )
            .await;

        // A record must not outlive a failed audit append.
        if let Err(append_err) = appended {
            if let Err(remove_err) = self.records.remove(ctx, &logical_id).await {
                warn!(
                    record_id = %record.id,
                    %remove_err,
                    "failed to remove record after audit append failure"
                );
            }
            return Err(append_err);
        }

        Ok(record)
    }

    /// Fetch a record by logical id.
    pub async fn get_record(
        &self,
        ctx: &TenantContext,
        logical_id: &str,
    ) -> Result<Option<EvidenceRecord>> {
        self.records.read(ctx, logical_id).await
    }

    /// Find the caller's record referencing a digest, if any.
    ///
    /// This is the ownership check over globally-addressed blobs: tenant A
    /// knowing tenant B's content hash learns nothing here, because only
    /// A's own records are searched.
    #[instrument(skip(self, ctx), fields(tenant = %ctx.tenant_id, %content_hash))]
    pub async fn find_by_content_hash(
        &self,
        ctx: &TenantContext,
        content_hash: &Digest,
    ) -> Result<Option<EvidenceRecord>> {
        let records = self.records.list(ctx).await?;
        Ok(records
            .into_iter()
            .find(|r| &r.content_hash == content_hash))
    }

    /// Tenant-scoped enumeration by facility.
    pub async fn list_by_facility(
        &self,
        ctx: &TenantContext,
        facility_id: &str,
    ) -> Result<Vec<EvidenceRecord>> {
        let records = self.records.list(ctx).await?;
        Ok(records
            .into_iter()
            .filter(|r| r.facility_id == facility_id)
            .collect())
    }

    /// Tenant-scoped enumeration by provider.
    pub async fn list_by_provider(
        &self,
        ctx: &TenantContext,
        provider_id: &str,
    ) -> Result<Vec<EvidenceRecord>> {
        let records = self.records.list(ctx).await?;
        Ok(records
            .into_iter()
            .filter(|r| r.provider_id == provider_id)
            .collect())
    }

    /// Download blob bytes, gated on the caller owning a record for them.
    ///
    /// A digest the caller has no record for fails with `NotFound` whether
    /// or not another tenant stored those bytes.
    #[instrument(skip(self, ctx), fields(tenant = %ctx.tenant_id, %content_hash))]
    pub async fn download(&self, ctx: &TenantContext, content_hash: &Digest) -> Result<Vec<u8>> {
        if self.find_by_content_hash(ctx, content_hash).await?.is_none() {
            return Err(StoreError::NotFound(content_hash.to_string()));
        }
        self.blobs.download(content_hash).await
    }

    /// Quarantine a blob and record the action in its audit chain.
    ///
    /// History is appended, never retracted: records referencing the digest
    /// stay queryable, only the byte fetch starts failing.
    #[instrument(skip(self, ctx), fields(tenant = %ctx.tenant_id, %content_hash))]
    pub async fn quarantine_blob(
        &self,
        ctx: &TenantContext,
        content_hash: &Digest,
    ) -> Result<()> {
        self.blobs.quarantine(content_hash).await?;
        self.ledger
            .append(
                ctx,
                &content_hash.to_string(),
                EventType::new(EventType::BLOB_QUARANTINED),
                &json!({ "contentHash": content_hash }),
            )
            .await?;
        Ok(())
    }

    /// Permanently delete a blob and record the action in its audit chain.
    #[instrument(skip(self, ctx), fields(tenant = %ctx.tenant_id, %content_hash))]
    pub async fn delete_blob(&self, ctx: &TenantContext, content_hash: &Digest) -> Result<()> {
        self.blobs.delete(content_hash).await?;
        self.ledger
            .append(
                ctx,
                &content_hash.to_string(),
                EventType::new(EventType::BLOB_DELETED),
                &json!({ "contentHash": content_hash }),
            )
            .await?;
        Ok(())
    }
}
