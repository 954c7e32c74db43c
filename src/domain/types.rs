//! Identifier and digest types for the evidence ledger.
//!
//! Tenant and actor identifiers are opaque strings supplied by the external
//! auth collaborator; this crate never interprets them beyond using them as
//! scoping prefixes. `Digest` is the canonical SHA-256 wrapper used for blob
//! content addressing and audit chain hashes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Tenant identifier (organization/account level).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(pub String);

impl TenantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TenantId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Actor identifier (the authenticated principal acting for a tenant).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(pub String);

impl ActorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ActorId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Caller context carried on every operation.
///
/// Resolved by the external auth collaborator; this crate trusts the context
/// it is given and performs no authentication itself. Never persisted as a
/// standalone entity, only used to scope reads and writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantContext {
    pub tenant_id: TenantId,
    pub actor_id: ActorId,
}

impl TenantContext {
    pub fn new(tenant_id: impl Into<TenantId>, actor_id: impl Into<ActorId>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            actor_id: actor_id.into(),
        }
    }
}

/// Event type classification for audit events.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventType(pub String);

impl EventType {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self(event_type.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    // Common event types
    pub const PROVIDER_CREATED: &'static str = "provider.created";
    pub const PROVIDER_UPDATED: &'static str = "provider.updated";
    pub const FACILITY_CREATED: &'static str = "facility.created";
    pub const FACILITY_UPDATED: &'static str = "facility.updated";
    pub const EVIDENCE_RECORDED: &'static str = "evidence.recorded";
    pub const BLOB_QUARANTINED: &'static str = "blob.quarantined";
    pub const BLOB_DELETED: &'static str = "blob.deleted";
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EventType {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EventType {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Error parsing a digest string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DigestParseError {
    #[error("unsupported digest algorithm prefix: {0}")]
    UnsupportedAlgorithm(String),

    #[error("invalid hex in digest: {0}")]
    InvalidHex(String),

    #[error("expected 32 bytes, got {0}")]
    WrongLength(usize),
}

/// 32-byte SHA-256 digest.
///
/// The canonical string form is `"sha256:" + 64 lowercase hex characters`.
/// Parsing accepts either the prefixed form or bare hex (case-insensitive)
/// and normalizes; serialization always emits the canonical form.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest(pub [u8; 32]);

impl Digest {
    pub const PREFIX: &'static str = "sha256:";

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex without the algorithm prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from canonical (`sha256:<hex>`) or bare-hex form.
    pub fn parse(s: &str) -> Result<Self, DigestParseError> {
        let hex_part = match s.split_once(':') {
            Some(("sha256", rest)) => rest,
            Some((algo, _)) => {
                return Err(DigestParseError::UnsupportedAlgorithm(algo.to_string()))
            }
            None => s,
        };

        let bytes = hex::decode(hex_part)
            .map_err(|_| DigestParseError::InvalidHex(hex_part.to_string()))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| DigestParseError::WrongLength(b.len()))?;
        Ok(Self(arr))
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::PREFIX, self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({}{})", Self::PREFIX, self.to_hex())
    }
}

impl FromStr for Digest {
    type Err = DigestParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Digest {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Digest::parse(&s).map_err(serde::de::Error::custom)
    }
}
