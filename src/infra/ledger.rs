//! Hash-chained audit ledger service.
//!
//! `AuditLedger` appends immutable, per-entity event chains on top of a
//! [`LedgerStore`] backend. Each append reads the chain head and persists a
//! new event committing to the head's hash; that read/persist pair is a
//! critical section per (tenant, entity), serialized through a keyed async
//! mutex so two concurrent appends can never both link to the same
//! predecessor and fork the chain. Appends for different entities proceed
//! fully in parallel.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{error, instrument};
use uuid::Uuid;

use crate::crypto::{compute_event_hash, payload_hash, EventHashParams};
use crate::domain::{AuditEvent, EventType, TenantContext};
use crate::scope::TenantScope;

use super::{LedgerStore, Result, StoreError};

type ChainKey = (String, String);

/// Append-only, tamper-evident audit ledger.
pub struct AuditLedger {
    store: Arc<dyn LedgerStore>,
    // One mutex per (tenant, entity) chain. Entries are created on first
    // append; idle entries are pruned on the next acquisition.
    chain_locks: Mutex<HashMap<ChainKey, Arc<Mutex<()>>>>,
}

impl AuditLedger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            store,
            chain_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Append a new event to an entity's chain and return it.
    ///
    /// The payload is serialized deterministically for hashing but not
    /// interpreted; domain meaning belongs to the caller.
    #[instrument(skip(self, ctx, payload), fields(tenant = %ctx.tenant_id, entity_id, event_type = %event_type))]
    pub async fn append(
        &self,
        ctx: &TenantContext,
        entity_id: &str,
        event_type: EventType,
        payload: &serde_json::Value,
    ) -> Result<AuditEvent> {
        let lock = self.chain_lock(ctx, entity_id).await;
        let _guard = lock.lock().await;

        let prev = self.store.head(&ctx.tenant_id, entity_id).await?;
        let previous_event_hash = prev.map(|e| e.event_hash);

        let timestamp = Utc::now();
        let ph = payload_hash(payload);
        let event_hash = compute_event_hash(&EventHashParams {
            event_type: &event_type,
            payload_hash: &ph,
            previous_event_hash: previous_event_hash.as_ref(),
            timestamp: &timestamp,
            actor_id: &ctx.actor_id,
        });

        let event = AuditEvent {
            event_id: TenantScope::scope(&ctx.tenant_id, &format!("evt-{}", Uuid::new_v4()))?,
            event_type,
            timestamp,
            actor_id: ctx.actor_id.clone(),
            payload_hash: ph,
            previous_event_hash,
            event_hash,
        };

        self.store
            .append_event(&ctx.tenant_id, entity_id, &event)
            .await?;

        Ok(event)
    }

    /// All events for an entity, in append order.
    ///
    /// The returned sequence satisfies the chain invariant for any external
    /// verifier: the first event has no predecessor hash, and every later
    /// event's `previous_event_hash` equals its predecessor's `event_hash`.
    #[instrument(skip(self, ctx), fields(tenant = %ctx.tenant_id, entity_id))]
    pub async fn list(&self, ctx: &TenantContext, entity_id: &str) -> Result<Vec<AuditEvent>> {
        self.store.list(&ctx.tenant_id, entity_id).await
    }

    /// List an entity's chain and verify its integrity in one call.
    pub async fn verify(&self, ctx: &TenantContext, entity_id: &str) -> Result<Vec<AuditEvent>> {
        let events = self.list(ctx, entity_id).await?;
        verify_chain(&events)?;
        Ok(events)
    }

    async fn chain_lock(&self, ctx: &TenantContext, entity_id: &str) -> Arc<Mutex<()>> {
        let key = (
            ctx.tenant_id.as_str().to_string(),
            entity_id.to_string(),
        );
        let mut locks = self.chain_locks.lock().await;
        let lock = Arc::clone(locks.entry(key).or_default());
        // An entry only the map still holds belongs to an idle chain; any
        // append in flight keeps a second strong reference.
        locks.retain(|_, l| Arc::strong_count(l) > 1);
        lock
    }

    #[cfg(test)]
    async fn chain_lock_count(&self) -> usize {
        self.chain_locks.lock().await.len()
    }
}

/// Verify a chain of events as returned by `list`.
///
/// Recomputes every `event_hash` from stored fields and confirms each link
/// to its predecessor. A failure means either a bug in append serialization
/// or out-of-band tampering with the storage medium; it is reported at
/// error level and must reach a human, never be silently recovered from.
pub fn verify_chain(events: &[AuditEvent]) -> Result<()> {
    for (index, event) in events.iter().enumerate() {
        let recomputed = event.recompute_event_hash();
        if recomputed != event.event_hash {
            let reason = format!(
                "stored event_hash {} does not match recomputed {}",
                event.event_hash, recomputed
            );
            error!(index, event_id = %event.event_id, %reason, "audit chain broken");
            return Err(StoreError::ChainBroken { index, reason });
        }

        match (index, &event.previous_event_hash) {
            (0, None) => {}
            (0, Some(prev)) => {
                let reason = format!("first event references predecessor {prev}");
                error!(index, event_id = %event.event_id, %reason, "audit chain broken");
                return Err(StoreError::ChainBroken { index, reason });
            }
            (_, None) => {
                let reason = "missing previous_event_hash".to_string();
                error!(index, event_id = %event.event_id, %reason, "audit chain broken");
                return Err(StoreError::ChainBroken { index, reason });
            }
            (_, Some(prev)) => {
                let expected = &events[index - 1].event_hash;
                if prev != expected {
                    let reason = format!(
                        "previous_event_hash {prev} does not match predecessor {expected}"
                    );
                    error!(index, event_id = %event.event_id, %reason, "audit chain broken");
                    return Err(StoreError::ChainBroken { index, reason });
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::MemoryLedgerStore;
    use serde_json::json;

    fn ledger() -> AuditLedger {
        AuditLedger::new(Arc::new(MemoryLedgerStore::new()))
    }

    fn ctx() -> TenantContext {
        TenantContext::new("tenant-a", "actor-1")
    }

    #[tokio::test]
    async fn test_first_event_has_no_predecessor() {
        let ledger = ledger();
        let event = ledger
            .append(&ctx(), "p1", EventType::new(EventType::PROVIDER_CREATED), &json!({"n": 1}))
            .await
            .unwrap();

        assert!(event.previous_event_hash.is_none());
        assert!(event.verify_hash());
    }

    #[tokio::test]
    async fn test_second_event_links_to_first() {
        let ledger = ledger();
        let ctx = ctx();

        let first = ledger
            .append(&ctx, "p1", EventType::new(EventType::PROVIDER_CREATED), &json!({"n": 1}))
            .await
            .unwrap();
        let second = ledger
            .append(&ctx, "p1", EventType::new(EventType::PROVIDER_UPDATED), &json!({"n": 2}))
            .await
            .unwrap();

        assert_eq!(second.previous_event_hash, Some(first.event_hash));
    }

    #[tokio::test]
    async fn test_chains_never_cross_entities() {
        let ledger = ledger();
        let ctx = ctx();

        let p1 = ledger
            .append(&ctx, "p1", EventType::new(EventType::PROVIDER_CREATED), &json!({}))
            .await
            .unwrap();
        let p2 = ledger
            .append(&ctx, "p2", EventType::new(EventType::PROVIDER_CREATED), &json!({}))
            .await
            .unwrap();

        // Both are chain heads; neither references the other.
        assert!(p1.previous_event_hash.is_none());
        assert!(p2.previous_event_hash.is_none());
    }

    #[tokio::test]
    async fn test_verify_accepts_valid_chain() {
        let ledger = ledger();
        let ctx = ctx();

        for i in 0..5 {
            ledger
                .append(&ctx, "p1", EventType::new(EventType::PROVIDER_UPDATED), &json!({"i": i}))
                .await
                .unwrap();
        }

        let events = ledger.verify(&ctx, "p1").await.unwrap();
        assert_eq!(events.len(), 5);
    }

    #[tokio::test]
    async fn test_verify_chain_detects_tampered_link() {
        let ledger = ledger();
        let ctx = ctx();

        ledger
            .append(&ctx, "p1", EventType::new(EventType::PROVIDER_CREATED), &json!({"n": 1}))
            .await
            .unwrap();
        ledger
            .append(&ctx, "p1", EventType::new(EventType::PROVIDER_UPDATED), &json!({"n": 2}))
            .await
            .unwrap();

        let mut events = ledger.list(&ctx, "p1").await.unwrap();

        // Simulate an out-of-band edit to the stored chain.
        events[1].previous_event_hash = None;

        let err = verify_chain(&events).unwrap_err();
        assert!(matches!(err, StoreError::ChainBroken { index: 1, .. }));
    }

    #[tokio::test]
    async fn test_verify_chain_detects_rewritten_payload_hash() {
        let ledger = ledger();
        let ctx = ctx();

        ledger
            .append(&ctx, "p1", EventType::new(EventType::PROVIDER_CREATED), &json!({"n": 1}))
            .await
            .unwrap();

        let mut events = ledger.list(&ctx, "p1").await.unwrap();
        events[0].payload_hash = payload_hash(&json!({"n": 999}));

        let err = verify_chain(&events).unwrap_err();
        assert!(matches!(err, StoreError::ChainBroken { index: 0, .. }));
    }

    #[tokio::test]
    async fn test_identical_payloads_share_payload_hash_not_event_hash() {
        let ledger = ledger();
        let ctx = ctx();
        let payload = json!({"name": "Acme"});

        let a = ledger
            .append(&ctx, "p1", EventType::new(EventType::PROVIDER_CREATED), &payload)
            .await
            .unwrap();
        let b = ledger
            .append(&ctx, "p2", EventType::new(EventType::PROVIDER_CREATED), &payload)
            .await
            .unwrap();

        assert_eq!(a.payload_hash, b.payload_hash);
        assert_ne!(a.event_hash, b.event_hash);
    }

    #[tokio::test]
    async fn test_idle_chain_locks_are_pruned() {
        let ledger = ledger();
        let ctx = ctx();

        for i in 0..8 {
            ledger
                .append(
                    &ctx,
                    &format!("p{i}"),
                    EventType::new(EventType::PROVIDER_CREATED),
                    &json!({}),
                )
                .await
                .unwrap();
        }

        // Only the most recently acquired entry survives; the seven idle
        // chains were pruned as later appends took the outer lock.
        assert_eq!(ledger.chain_lock_count().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_appends_do_not_fork_the_chain() {
        let ledger = Arc::new(ledger());
        let ctx = ctx();

        let mut handles = Vec::new();
        for i in 0..16 {
            let ledger = Arc::clone(&ledger);
            let ctx = ctx.clone();
            handles.push(tokio::spawn(async move {
                ledger
                    .append(
                        &ctx,
                        "p1",
                        EventType::new(EventType::PROVIDER_UPDATED),
                        &json!({"i": i}),
                    )
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let events = ledger.list(&ctx, "p1").await.unwrap();
        assert_eq!(events.len(), 16);
        verify_chain(&events).unwrap();
    }
}
