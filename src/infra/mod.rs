//! Storage and service layer.
//!
//! Backends implement the traits in [`traits`]; everything above them
//! (`TenantStore`, `AuditLedger`, `EvidenceService`) is backend-agnostic.

mod blob;
mod error;
mod evidence;
mod ids;
mod keyed;
mod ledger;
mod memory;
pub mod postgres;
mod traits;

pub use blob::{BlobStoreConfig, FsBlobStore};
pub use error::{Result, StoreError};
pub use evidence::EvidenceService;
pub use ids::IdGenerator;
pub use keyed::TenantStore;
pub use ledger::{verify_chain, AuditLedger};
pub use memory::{MemoryBackend, MemoryLedgerStore};
pub use postgres::{PgBackend, PgLedgerStore};
pub use traits::{BlobStore, KeyValueBackend, LedgerStore};

#[cfg(test)]
pub use traits::{MockBlobStore, MockKeyValueBackend, MockLedgerStore};
