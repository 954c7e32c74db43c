//! Error types for the evidence ledger infrastructure.

use thiserror::Error;

use crate::domain::Digest;

/// Errors that can occur in the ledger and evidence store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Blob, record, or event-chain entity absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// A scoped-key or content-hash lookup resolved to another tenant's
    /// data. Externally indistinguishable from `NotFound` (see
    /// [`StoreError::is_not_found`]); kept distinct for diagnostics.
    #[error("key not owned by caller: {key}")]
    NotOwned { key: String },

    /// Evidence record creation referenced a digest with no uploaded content.
    #[error("blob not found: {0}")]
    BlobNotFound(Digest),

    /// Chain verification detected a discontinuity: either a bug in append
    /// serialization or out-of-band tampering. Never silently recovered.
    #[error("audit chain broken at index {index}: {reason}")]
    ChainBroken { index: usize, reason: String },

    /// Underlying storage I/O exceeded its budget.
    #[error("storage operation timed out: {operation}")]
    Timeout { operation: String },

    /// Malformed tenant or logical identifier.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Whether this error should surface to external callers as "not found".
    ///
    /// `NotFound` and `NotOwned` are deliberately collapsed here so that a
    /// lookup against another tenant's data is indistinguishable from a
    /// lookup against nothing, and the existence of foreign records never
    /// leaks.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::NotFound(_) | StoreError::NotOwned { .. } | StoreError::BlobNotFound(_)
        )
    }
}

/// Result type for ledger and store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
