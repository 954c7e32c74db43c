//! In-memory storage backends.
//!
//! The reference backends for tests and single-process deployments: a flat
//! sorted map keyed by scoped string, and an append-only event log per
//! (tenant, entity). Both present the same traits as the PostgreSQL
//! backends, so the ledger and evidence logic stays backend-agnostic.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{AuditEvent, TenantId};
use crate::scope::ScopedKey;

use super::{KeyValueBackend, LedgerStore, Result};

/// In-memory key-value backend.
#[derive(Default)]
pub struct MemoryBackend {
    records: RwLock<BTreeMap<String, serde_json::Value>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records, across all tenants.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl KeyValueBackend for MemoryBackend {
    async fn put(&self, key: &ScopedKey, record: serde_json::Value) -> Result<()> {
        self.records
            .write()
            .await
            .insert(key.as_str().to_string(), record);
        Ok(())
    }

    async fn get(&self, key: &ScopedKey) -> Result<Option<serde_json::Value>> {
        Ok(self.records.read().await.get(key.as_str()).cloned())
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<ScopedKey>> {
        let records = self.records.read().await;
        Ok(records
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| ScopedKey::new(k.clone()))
            .collect())
    }

    async fn delete(&self, key: &ScopedKey) -> Result<()> {
        self.records.write().await.remove(key.as_str());
        Ok(())
    }
}

/// In-memory append-only ledger storage.
///
/// Chains are keyed by (tenant, entity); the public API exposes no way to
/// update or remove an appended event.
#[derive(Default)]
pub struct MemoryLedgerStore {
    chains: RwLock<BTreeMap<(String, String), Vec<AuditEvent>>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn chain_key(tenant_id: &TenantId, entity_id: &str) -> (String, String) {
        (tenant_id.as_str().to_string(), entity_id.to_string())
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn append_event(
        &self,
        tenant_id: &TenantId,
        entity_id: &str,
        event: &AuditEvent,
    ) -> Result<()> {
        let mut chains = self.chains.write().await;
        chains
            .entry(Self::chain_key(tenant_id, entity_id))
            .or_default()
            .push(event.clone());
        Ok(())
    }

    async fn head(&self, tenant_id: &TenantId, entity_id: &str) -> Result<Option<AuditEvent>> {
        let chains = self.chains.read().await;
        Ok(chains
            .get(&Self::chain_key(tenant_id, entity_id))
            .and_then(|chain| chain.last().cloned()))
    }

    async fn list(&self, tenant_id: &TenantId, entity_id: &str) -> Result<Vec<AuditEvent>> {
        let chains = self.chains.read().await;
        Ok(chains
            .get(&Self::chain_key(tenant_id, entity_id))
            .cloned()
            .unwrap_or_default())
    }
}
