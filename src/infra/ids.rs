//! Per-tenant logical id generation.

use std::collections::HashMap;

use tokio::sync::Mutex;

use crate::domain::TenantId;

/// Issues monotonic logical ids like `evidence-7`, counted per tenant.
///
/// Counters are process-local shared state and sit behind a mutex; the
/// sequence restarts when the process does, which is fine because ids are
/// only required to be unique within a tenant's live store, not dense.
pub struct IdGenerator {
    prefix: &'static str,
    counters: Mutex<HashMap<String, u64>>,
}

impl IdGenerator {
    pub fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            counters: Mutex::new(HashMap::new()),
        }
    }

    /// Next logical id for a tenant.
    pub async fn next(&self, tenant_id: &TenantId) -> String {
        let mut counters = self.counters.lock().await;
        let counter = counters
            .entry(tenant_id.as_str().to_string())
            .or_insert(0);
        *counter += 1;
        format!("{}-{}", self.prefix, counter)
    }

    /// Advance a tenant's counter past ids already in use (e.g. after
    /// loading an existing store).
    pub async fn advance_past(&self, tenant_id: &TenantId, seen: u64) {
        let mut counters = self.counters.lock().await;
        let counter = counters
            .entry(tenant_id.as_str().to_string())
            .or_insert(0);
        if seen > *counter {
            *counter = seen;
        }
    }
}
