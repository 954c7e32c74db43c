//! Evidence Ledger Library
//!
//! Tenant-isolated, tamper-evident audit ledger and content-addressed
//! evidence store for regulated-entity compliance history.
//!
//! ## Modules
//!
//! - [`domain`] - Core domain types (digests, audit events, evidence records)
//! - [`crypto`] - Canonical JSON hashing and chain hash computation
//! - [`scope`] - Tenant key scoping (the isolation boundary)
//! - [`infra`] - Infrastructure implementations (in-memory, PostgreSQL, filesystem blobs)
//! - [`telemetry`] - Tracing initialization

pub mod crypto;
pub mod domain;
pub mod infra;
pub mod scope;
pub mod telemetry;

// Re-export commonly used types
pub use domain::{
    ActorId, AuditEvent, Digest, EventType, EvidenceBlob, EvidenceRecord, NewEvidenceRecord,
    TenantContext, TenantId,
};

pub use infra::{
    AuditLedger, BlobStore, BlobStoreConfig, EvidenceService, FsBlobStore, IdGenerator,
    KeyValueBackend, LedgerStore, MemoryBackend, MemoryLedgerStore, Result, StoreError,
    TenantStore,
};

pub use scope::{ScopedKey, TenantScope};
