//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use tempfile::TempDir;

use evidence_ledger::infra::{AuditLedger, MemoryBackend, MemoryLedgerStore};
use evidence_ledger::{
    BlobStoreConfig, EvidenceService, FsBlobStore, NewEvidenceRecord, TenantContext,
};

pub fn ctx_a() -> TenantContext {
    TenantContext::new("tenant-a", "auditor-1")
}

pub fn ctx_b() -> TenantContext {
    TenantContext::new("tenant-b", "auditor-2")
}

/// A blob store rooted in a fresh temp directory. Keep the `TempDir` alive
/// for the duration of the test.
pub fn blob_store() -> (TempDir, Arc<FsBlobStore>) {
    let dir = tempfile::tempdir().unwrap();
    let store = FsBlobStore::new(BlobStoreConfig::new(dir.path())).unwrap();
    (dir, Arc::new(store))
}

/// Fully in-memory evidence stack (filesystem blobs aside).
pub fn evidence_service() -> (TempDir, Arc<AuditLedger>, EvidenceService) {
    let (dir, blobs) = blob_store();
    let ledger = Arc::new(AuditLedger::new(Arc::new(MemoryLedgerStore::new())));
    let service = EvidenceService::new(
        Arc::new(MemoryBackend::new()),
        blobs,
        Arc::clone(&ledger),
    );
    (dir, ledger, service)
}

pub fn new_record(
    content_hash: evidence_ledger::Digest,
    provider_id: &str,
    facility_id: &str,
) -> NewEvidenceRecord {
    NewEvidenceRecord {
        provider_id: provider_id.to_string(),
        facility_id: facility_id.to_string(),
        content_hash,
        evidence_type: "inspection-report".to_string(),
        file_name: "report.pdf".to_string(),
        description: Some("Q3 fire-safety inspection".to_string()),
    }
}
