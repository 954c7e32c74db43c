//! Tenant-isolated typed store.
//!
//! `TenantStore<T>` is the generic "tenant-isolated map of anything": a flat
//! backend keyed by scoped string with a typed accessor wrapper per record
//! type. Every operation scopes through [`TenantScope`], so a caller can
//! never retrieve another tenant's record by guessing a logical id, and a
//! foreign scoped key reads as absent rather than as an error that would
//! reveal the foreign record's existence.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::instrument;

use crate::domain::TenantContext;
use crate::scope::{ScopedKey, TenantScope};

use super::{KeyValueBackend, Result};

/// Typed key-value store scoped to the caller's tenant.
pub struct TenantStore<T> {
    backend: Arc<dyn KeyValueBackend>,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for TenantStore<T> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            _record: PhantomData,
        }
    }
}

impl<T> TenantStore<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(backend: Arc<dyn KeyValueBackend>) -> Self {
        Self {
            backend,
            _record: PhantomData,
        }
    }

    /// Upsert a record under the caller's scope.
    #[instrument(skip(self, ctx, record), fields(tenant = %ctx.tenant_id, logical_id))]
    pub async fn write(&self, ctx: &TenantContext, logical_id: &str, record: &T) -> Result<()> {
        let key = TenantScope::scope(&ctx.tenant_id, logical_id)?;
        let value = serde_json::to_value(record)?;
        self.backend.put(&key, value).await
    }

    /// Fetch a record by logical id, scoped to the caller's tenant.
    #[instrument(skip(self, ctx), fields(tenant = %ctx.tenant_id, logical_id))]
    pub async fn read(&self, ctx: &TenantContext, logical_id: &str) -> Result<Option<T>> {
        let key = TenantScope::scope(&ctx.tenant_id, logical_id)?;
        self.read_scoped(&key).await
    }

    /// Fetch a record by an already-scoped key (e.g. a foreign-key reference
    /// held inside another record).
    ///
    /// Still enforces ownership: a key belonging to another tenant returns
    /// `None`, never the foreign record.
    #[instrument(skip(self, ctx), fields(tenant = %ctx.tenant_id, key = %key))]
    pub async fn read_by_key(&self, ctx: &TenantContext, key: &ScopedKey) -> Result<Option<T>> {
        if !TenantScope::owns(&ctx.tenant_id, key) {
            return Ok(None);
        }
        self.read_scoped(key).await
    }

    /// Enumerate the caller's logical ids, in sorted order.
    #[instrument(skip(self, ctx), fields(tenant = %ctx.tenant_id))]
    pub async fn list_keys(&self, ctx: &TenantContext) -> Result<Vec<String>> {
        let prefix = TenantScope::prefix(&ctx.tenant_id)?;
        let keys = self.backend.list_keys(&prefix).await?;
        keys.iter()
            .map(|k| TenantScope::unscope(&ctx.tenant_id, k))
            .collect()
    }

    /// Fetch all of the caller's records, in key order.
    pub async fn list(&self, ctx: &TenantContext) -> Result<Vec<T>> {
        let prefix = TenantScope::prefix(&ctx.tenant_id)?;
        let keys = self.backend.list_keys(&prefix).await?;

        let mut records = Vec::with_capacity(keys.len());
        for key in &keys {
            // Concurrent deletes can race enumeration; skip vanished rows.
            if let Some(record) = self.read_scoped(key).await? {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Remove a record under the caller's scope; absent ids are not an error.
    #[instrument(skip(self, ctx), fields(tenant = %ctx.tenant_id, logical_id))]
    pub async fn remove(&self, ctx: &TenantContext, logical_id: &str) -> Result<()> {
        let key = TenantScope::scope(&ctx.tenant_id, logical_id)?;
        self.backend.delete(&key).await
    }

    async fn read_scoped(&self, key: &ScopedKey) -> Result<Option<T>> {
        match self.backend.get(key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }
}
