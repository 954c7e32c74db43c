//! Content-addressed filesystem blob store.
//!
//! Bytes are persisted under a path derived from their own SHA-256 digest,
//! sharded by the first two and next two hex characters to bound directory
//! fan-out:
//!
//! ```text
//! <root>/ab/cd/abcd...        servable bytes
//! <root>/.meta/abcd....json   blob metadata (survives quarantine)
//! <root>/.quarantine/abcd...  quarantined bytes
//! <root>/.tmp/<uuid>          in-flight writes
//! ```
//!
//! Writes go to a temp file first and are renamed into place, bytes before
//! metadata, so readers only ever observe fully written files: an abandoned
//! upload leaves at worst an unreferenced byte file that the next identical
//! upload overwrites, never stat-visible metadata without content.
//! Concurrent uploads of identical content race harmlessly to the same
//! result. Every filesystem call runs under a configurable timeout.

use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::fs;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::crypto::content_digest;
use crate::domain::{Digest, EvidenceBlob};

use super::{BlobStore, Result, StoreError};

const META_DIR: &str = ".meta";
const QUARANTINE_DIR: &str = ".quarantine";
const TMP_DIR: &str = ".tmp";

/// Configuration for the filesystem blob store.
#[derive(Debug, Clone)]
pub struct BlobStoreConfig {
    /// Root directory for blob content.
    pub root: PathBuf,
    /// Budget for each filesystem operation.
    pub io_timeout: Duration,
}

impl BlobStoreConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            io_timeout: Duration::from_secs(10),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let root = std::env::var("BLOB_STORE_ROOT").unwrap_or_else(|_| "./blobs".to_string());

        let io_timeout_ms: u64 = std::env::var("BLOB_IO_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10_000);

        Self {
            root: PathBuf::from(root),
            io_timeout: Duration::from_millis(io_timeout_ms),
        }
    }

    pub fn with_io_timeout(mut self, io_timeout: Duration) -> Self {
        self.io_timeout = io_timeout;
        self
    }
}

/// Filesystem-backed content-addressed blob store.
pub struct FsBlobStore {
    root: PathBuf,
    io_timeout: Duration,
}

impl FsBlobStore {
    /// Create a store rooted at the configured directory, creating the
    /// layout if needed.
    pub fn new(config: BlobStoreConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.root)?;
        std::fs::create_dir_all(config.root.join(META_DIR))?;
        std::fs::create_dir_all(config.root.join(QUARANTINE_DIR))?;
        std::fs::create_dir_all(config.root.join(TMP_DIR))?;

        info!(root = %config.root.display(), "initialized blob store");

        Ok(Self {
            root: config.root,
            io_timeout: config.io_timeout,
        })
    }

    /// Servable path for a digest, relative to the store root.
    pub fn relative_blob_path(digest: &Digest) -> PathBuf {
        let hex = digest.to_hex();
        PathBuf::from(&hex[0..2]).join(&hex[2..4]).join(&hex)
    }

    fn blob_path(&self, digest: &Digest) -> PathBuf {
        self.root.join(Self::relative_blob_path(digest))
    }

    fn meta_path(&self, digest: &Digest) -> PathBuf {
        self.root
            .join(META_DIR)
            .join(format!("{}.json", digest.to_hex()))
    }

    fn quarantine_path(&self, digest: &Digest) -> PathBuf {
        self.root.join(QUARANTINE_DIR).join(digest.to_hex())
    }

    fn tmp_path(&self) -> PathBuf {
        self.root.join(TMP_DIR).join(Uuid::new_v4().to_string())
    }

    async fn io<T, F>(&self, operation: &str, fut: F) -> Result<T>
    where
        F: Future<Output = std::io::Result<T>>,
    {
        match tokio::time::timeout(self.io_timeout, fut).await {
            Ok(result) => result.map_err(StoreError::from),
            Err(_) => Err(StoreError::Timeout {
                operation: operation.to_string(),
            }),
        }
    }

    async fn path_exists(&self, operation: &str, path: &Path) -> Result<bool> {
        match tokio::time::timeout(self.io_timeout, fs::metadata(path)).await {
            Ok(Ok(_)) => Ok(true),
            Ok(Err(e)) if e.kind() == ErrorKind::NotFound => Ok(false),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(StoreError::Timeout {
                operation: operation.to_string(),
            }),
        }
    }

    /// Write a file atomically: temp file in `.tmp/`, then rename.
    async fn write_atomic(&self, operation: &str, target: &Path, bytes: &[u8]) -> Result<()> {
        let tmp = self.tmp_path();
        self.io(operation, fs::write(&tmp, bytes)).await?;
        self.io(operation, fs::rename(&tmp, target)).await
    }

    async fn remove_if_present(&self, operation: &str, path: &Path) -> Result<()> {
        match tokio::time::timeout(self.io_timeout, fs::remove_file(path)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) if e.kind() == ErrorKind::NotFound => Ok(()),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(StoreError::Timeout {
                operation: operation.to_string(),
            }),
        }
    }

    async fn read_meta(&self, digest: &Digest) -> Result<Option<EvidenceBlob>> {
        match tokio::time::timeout(self.io_timeout, fs::read(self.meta_path(digest))).await {
            Ok(Ok(bytes)) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Ok(Err(e)) if e.kind() == ErrorKind::NotFound => Ok(None),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(StoreError::Timeout {
                operation: "blob.stat".to_string(),
            }),
        }
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    #[instrument(skip(self, bytes), fields(size = bytes.len(), content_type))]
    async fn upload(&self, bytes: &[u8], content_type: &str) -> Result<EvidenceBlob> {
        // Hash the exact byte sequence received; no normalization.
        let digest = content_digest(bytes);

        // Metadata is the authority on whether a digest is known: it
        // survives quarantine, so re-uploading quarantined content returns
        // the original metadata without reinstating the bytes. Clearing a
        // quarantine takes an explicit delete followed by a fresh upload.
        if let Some(existing) = self.read_meta(&digest).await? {
            debug!(%digest, "dedup short-circuit");
            return Ok(existing);
        }

        let blob = EvidenceBlob {
            content_hash: digest,
            content_type: content_type.to_string(),
            size_bytes: bytes.len() as u64,
            uploaded_at: Utc::now(),
            storage_path: Self::relative_blob_path(&digest)
                .to_string_lossy()
                .into_owned(),
        };

        let blob_path = self.blob_path(&digest);
        if let Some(shard) = blob_path.parent() {
            self.io("blob.upload", fs::create_dir_all(shard)).await?;
        }

        // Bytes land before the metadata. An upload interrupted between the
        // two renames leaves only an unreferenced byte file that the next
        // identical upload overwrites; stat never sees metadata for content
        // that was not fully stored.
        self.write_atomic("blob.upload", &blob_path, bytes).await?;
        let meta_bytes = serde_json::to_vec(&blob)?;
        self.write_atomic("blob.upload", &self.meta_path(&digest), &meta_bytes)
            .await?;

        info!(%digest, size = blob.size_bytes, "stored new blob");
        Ok(blob)
    }

    async fn exists(&self, digest: &Digest) -> Result<bool> {
        self.path_exists("blob.exists", &self.blob_path(digest)).await
    }

    async fn stat(&self, digest: &Digest) -> Result<Option<EvidenceBlob>> {
        self.read_meta(digest).await
    }

    #[instrument(skip(self), fields(%digest))]
    async fn download(&self, digest: &Digest) -> Result<Vec<u8>> {
        match tokio::time::timeout(self.io_timeout, fs::read(self.blob_path(digest))).await {
            Ok(Ok(bytes)) => Ok(bytes),
            Ok(Err(e)) if e.kind() == ErrorKind::NotFound => {
                Err(StoreError::NotFound(digest.to_string()))
            }
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(StoreError::Timeout {
                operation: "blob.download".to_string(),
            }),
        }
    }

    #[instrument(skip(self), fields(%digest))]
    async fn quarantine(&self, digest: &Digest) -> Result<()> {
        let blob_path = self.blob_path(digest);
        let quarantine_path = self.quarantine_path(digest);

        match tokio::time::timeout(self.io_timeout, fs::rename(&blob_path, &quarantine_path)).await
        {
            Ok(Ok(())) => {
                info!(%digest, "quarantined blob");
                Ok(())
            }
            Ok(Err(e)) if e.kind() == ErrorKind::NotFound => {
                // Already quarantined is idempotent; never-uploaded is not.
                if self.path_exists("blob.quarantine", &quarantine_path).await? {
                    Ok(())
                } else {
                    Err(StoreError::NotFound(digest.to_string()))
                }
            }
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(StoreError::Timeout {
                operation: "blob.quarantine".to_string(),
            }),
        }
    }

    #[instrument(skip(self), fields(%digest))]
    async fn delete(&self, digest: &Digest) -> Result<()> {
        self.remove_if_present("blob.delete", &self.blob_path(digest))
            .await?;
        self.remove_if_present("blob.delete", &self.quarantine_path(digest))
            .await?;
        self.remove_if_present("blob.delete", &self.meta_path(digest))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_path_is_sharded() {
        let digest = content_digest(b"hello");
        let path = FsBlobStore::relative_blob_path(&digest);
        assert_eq!(
            path,
            PathBuf::from("2c")
                .join("f2")
                .join("2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824")
        );
    }

    #[tokio::test]
    async fn test_upload_creates_sharded_file_and_meta() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(BlobStoreConfig::new(dir.path())).unwrap();

        let blob = store.upload(b"hello", "text/plain").await.unwrap();
        assert_eq!(blob.size_bytes, 5);
        assert_eq!(blob.content_type, "text/plain");
        assert_eq!(blob.storage_path, "2c/f2/2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824");

        assert!(dir.path().join(&blob.storage_path).is_file());
        assert!(store.exists(&blob.content_hash).await.unwrap());
        assert_eq!(store.stat(&blob.content_hash).await.unwrap(), Some(blob));
    }

    #[tokio::test]
    async fn test_download_absent_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(BlobStoreConfig::new(dir.path())).unwrap();

        let digest = content_digest(b"never uploaded");
        let err = store.download(&digest).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_quarantine_never_uploaded_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(BlobStoreConfig::new(dir.path())).unwrap();

        let digest = content_digest(b"never uploaded");
        let err = store.quarantine(&digest).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_quarantine_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(BlobStoreConfig::new(dir.path())).unwrap();

        let blob = store.upload(b"suspicious", "text/plain").await.unwrap();
        store.quarantine(&blob.content_hash).await.unwrap();
        store.quarantine(&blob.content_hash).await.unwrap();

        assert!(!store.exists(&blob.content_hash).await.unwrap());
    }
}
