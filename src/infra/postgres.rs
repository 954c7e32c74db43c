//! PostgreSQL storage backends.
//!
//! `PgBackend` persists the flat scoped-key map as a single JSONB table;
//! `PgLedgerStore` persists audit chains append-only, ordered by an
//! insertion ordinal. Both expose the same traits as the in-memory
//! backends, so the ledger and evidence logic never sees the difference.
//!
//! Digests are stored in their canonical `sha256:<hex>` text form, and
//! timestamps as TIMESTAMPTZ; event hashes commit to timestamps at
//! microsecond precision, which survives the PostgreSQL round trip.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::FromRow;

use crate::domain::{ActorId, AuditEvent, Digest, EventType, TenantId};
use crate::scope::ScopedKey;

use super::{KeyValueBackend, LedgerStore, Result, StoreError};

/// PostgreSQL key-value backend.
pub struct PgBackend {
    pool: PgPool,
}

impl PgBackend {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create from connection string.
    pub async fn from_url(url: &str) -> Result<Self> {
        let pool = PgPool::connect(url).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Initialize the backing table.
    pub async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv_records (
                scoped_key TEXT PRIMARY KEY,
                record JSONB NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn escape_like(prefix: &str) -> String {
        prefix
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_")
    }
}

#[async_trait]
impl KeyValueBackend for PgBackend {
    async fn put(&self, key: &ScopedKey, record: serde_json::Value) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO kv_records (scoped_key, record, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (scoped_key)
            DO UPDATE SET record = $2, updated_at = NOW()
            "#,
        )
        .bind(key.as_str())
        .bind(&record)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, key: &ScopedKey) -> Result<Option<serde_json::Value>> {
        let row: Option<(serde_json::Value,)> =
            sqlx::query_as(r#"SELECT record FROM kv_records WHERE scoped_key = $1"#)
                .bind(key.as_str())
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(record,)| record))
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<ScopedKey>> {
        let pattern = format!("{}%", Self::escape_like(prefix));
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT scoped_key FROM kv_records
            WHERE scoped_key LIKE $1 ESCAPE '\'
            ORDER BY scoped_key
            "#,
        )
        .bind(&pattern)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(k,)| ScopedKey::new(k)).collect())
    }

    async fn delete(&self, key: &ScopedKey) -> Result<()> {
        sqlx::query(r#"DELETE FROM kv_records WHERE scoped_key = $1"#)
            .bind(key.as_str())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

/// PostgreSQL append-only ledger storage.
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create from connection string.
    pub async fn from_url(url: &str) -> Result<Self> {
        let pool = PgPool::connect(url).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Initialize the backing table and indexes.
    pub async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS audit_events (
                ordinal BIGSERIAL PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                entity_id TEXT NOT NULL,
                event_id TEXT NOT NULL UNIQUE,
                event_type TEXT NOT NULL,
                event_timestamp TIMESTAMPTZ NOT NULL,
                actor_id TEXT NOT NULL,
                payload_hash TEXT NOT NULL,
                previous_event_hash TEXT,
                event_hash TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_audit_events_chain
            ON audit_events (tenant_id, entity_id, ordinal)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn append_event(
        &self,
        tenant_id: &TenantId,
        entity_id: &str,
        event: &AuditEvent,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_events (
                tenant_id, entity_id,
                event_id, event_type, event_timestamp, actor_id,
                payload_hash, previous_event_hash, event_hash
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(tenant_id.as_str())
        .bind(entity_id)
        .bind(event.event_id.as_str())
        .bind(event.event_type.as_str())
        .bind(event.timestamp)
        .bind(event.actor_id.as_str())
        .bind(event.payload_hash.to_string())
        .bind(event.previous_event_hash.map(|d| d.to_string()))
        .bind(event.event_hash.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn head(&self, tenant_id: &TenantId, entity_id: &str) -> Result<Option<AuditEvent>> {
        let row: Option<AuditEventRow> = sqlx::query_as(
            r#"
            SELECT event_id, event_type, event_timestamp, actor_id,
                   payload_hash, previous_event_hash, event_hash
            FROM audit_events
            WHERE tenant_id = $1 AND entity_id = $2
            ORDER BY ordinal DESC
            LIMIT 1
            "#,
        )
        .bind(tenant_id.as_str())
        .bind(entity_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(AuditEvent::try_from).transpose()
    }

    async fn list(&self, tenant_id: &TenantId, entity_id: &str) -> Result<Vec<AuditEvent>> {
        let rows: Vec<AuditEventRow> = sqlx::query_as(
            r#"
            SELECT event_id, event_type, event_timestamp, actor_id,
                   payload_hash, previous_event_hash, event_hash
            FROM audit_events
            WHERE tenant_id = $1 AND entity_id = $2
            ORDER BY ordinal ASC
            "#,
        )
        .bind(tenant_id.as_str())
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AuditEvent::try_from).collect()
    }
}

/// Database row for audit events.
#[derive(Debug, FromRow)]
struct AuditEventRow {
    event_id: String,
    event_type: String,
    event_timestamp: DateTime<Utc>,
    actor_id: String,
    payload_hash: String,
    previous_event_hash: Option<String>,
    event_hash: String,
}

impl TryFrom<AuditEventRow> for AuditEvent {
    type Error = StoreError;

    fn try_from(row: AuditEventRow) -> Result<AuditEvent> {
        let parse = |s: &str| {
            Digest::parse(s)
                .map_err(|e| StoreError::Internal(format!("invalid stored digest: {e}")))
        };

        Ok(AuditEvent {
            event_id: ScopedKey::new(row.event_id),
            event_type: EventType::new(row.event_type),
            timestamp: row.event_timestamp,
            actor_id: ActorId::new(row.actor_id),
            payload_hash: parse(&row.payload_hash)?,
            previous_event_hash: row
                .previous_event_hash
                .as_deref()
                .map(parse)
                .transpose()?,
            event_hash: parse(&row.event_hash)?,
        })
    }
}
