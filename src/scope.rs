//! Tenant key scoping.
//!
//! Every stored key and every audit entity id is derived through this module
//! so that two tenants can never read or overwrite each other's records,
//! even when they choose identical logical identifiers. `unscope` failing on
//! a foreign key is a security boundary, not a convenience: callers rely on
//! it to detect cross-tenant key confusion.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::TenantId;
use crate::infra::{Result, StoreError};

/// Separator between the tenant prefix and the logical identifier.
///
/// Tenant ids must not contain this character; otherwise the tenant owning a
/// scoped key would be ambiguous (`"a:b" + "c"` vs `"a" + "b:c"`).
pub const SCOPE_SEPARATOR: char = ':';

/// A tenant-qualified storage key, e.g. `"tenant-a:provider-17"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopedKey(pub String);

impl ScopedKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScopedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Derives and validates tenant-namespaced keys.
pub struct TenantScope;

impl TenantScope {
    /// Derive the scoped key for a logical identifier under a tenant.
    ///
    /// Deterministic and injective per tenant: the same tenant and logical
    /// id always yield the same key, and two tenants with the same logical
    /// id yield different keys.
    pub fn scope(tenant_id: &TenantId, logical_id: &str) -> Result<ScopedKey> {
        Self::validate_tenant(tenant_id)?;
        if logical_id.is_empty() {
            return Err(StoreError::InvalidKey(
                "logical id must not be empty".to_string(),
            ));
        }
        Ok(ScopedKey(format!(
            "{}{}{}",
            tenant_id.as_str(),
            SCOPE_SEPARATOR,
            logical_id
        )))
    }

    /// Recover the logical identifier from a scoped key.
    ///
    /// Fails with `NotOwned` when the key was not produced under
    /// `tenant_id`; it never returns a foreign tenant's logical id.
    pub fn unscope(tenant_id: &TenantId, key: &ScopedKey) -> Result<String> {
        Self::validate_tenant(tenant_id)?;
        let prefix = format!("{}{}", tenant_id.as_str(), SCOPE_SEPARATOR);
        match key.as_str().strip_prefix(&prefix) {
            Some(logical) if !logical.is_empty() => Ok(logical.to_string()),
            _ => Err(StoreError::NotOwned {
                key: key.to_string(),
            }),
        }
    }

    /// Whether a scoped key belongs to a tenant.
    pub fn owns(tenant_id: &TenantId, key: &ScopedKey) -> bool {
        Self::unscope(tenant_id, key).is_ok()
    }

    /// The prefix shared by every key of a tenant, used for enumeration.
    pub fn prefix(tenant_id: &TenantId) -> Result<String> {
        Self::validate_tenant(tenant_id)?;
        Ok(format!("{}{}", tenant_id.as_str(), SCOPE_SEPARATOR))
    }

    fn validate_tenant(tenant_id: &TenantId) -> Result<()> {
        let id = tenant_id.as_str();
        if id.is_empty() {
            return Err(StoreError::InvalidKey(
                "tenant id must not be empty".to_string(),
            ));
        }
        if id.contains(SCOPE_SEPARATOR) {
            return Err(StoreError::InvalidKey(format!(
                "tenant id must not contain '{}': {}",
                SCOPE_SEPARATOR, id
            )));
        }
        Ok(())
    }
}
