//! Claims resolution and typed permission projections.
//!
//! DESIGN
//! ======
//! Provider tokens carry registered JWT fields next to the permission
//! claims. [`Claims::from_raw`] keeps only the permission entries and types
//! their values, so lookups never throw on a missing key and every boolean
//! projection fails closed.
//!
//! TRADE-OFFS
//! ==========
//! Passive notifications resolve with `forced = false` and accept the
//! provider's cached grant: fewer round trips, at the cost of a stale-claims
//! window bounded by the provider's token lifetime. Sign-in and explicit
//! refreshes force a fresh grant.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ClaimsError;
use crate::ports::provider::{Identity, IdentityProvider, RawClaims};

pub const ADMIN: &str = "admin";
pub const SERVICE_PROVIDER: &str = "serviceProvider";

/// Token fields that are not permission claims.
const RESERVED: &[&str] = &[
    "iss",
    "aud",
    "auth_time",
    "user_id",
    "sub",
    "iat",
    "exp",
    "email",
    "email_verified",
    "firebase",
];

/// A single typed claim value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClaimValue {
    Bool(bool),
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl From<&serde_json::Value> for ClaimValue {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => n
                .as_f64()
                .map_or_else(|| Self::Other(value.clone()), Self::Number),
            serde_json::Value::String(s) => Self::Text(s.clone()),
            other => Self::Other(other.clone()),
        }
    }
}

/// Permission claims for one identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims {
    entries: BTreeMap<String, ClaimValue>,
}

impl Claims {
    /// Type a raw provider payload, dropping reserved token fields.
    #[must_use]
    pub fn from_raw(raw: &RawClaims) -> Self {
        let entries = raw
            .iter()
            .filter(|(key, _)| !RESERVED.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), ClaimValue::from(value)))
            .collect();
        Self { entries }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ClaimValue> {
        self.entries.get(name)
    }

    /// True only when `name` is present and literally `true`.
    #[must_use]
    pub fn flag(&self, name: &str) -> bool {
        matches!(self.entries.get(name), Some(ClaimValue::Bool(true)))
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.flag(ADMIN)
    }

    #[must_use]
    pub fn is_service_provider(&self) -> bool {
        self.flag(SERVICE_PROVIDER)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ClaimValue)> {
        self.entries
            .iter()
            .map(|(k, v)| (k.as_str(), v))
    }
}

/// Admin projection over possibly-absent claims.
#[must_use]
pub fn is_admin(claims: Option<&Claims>) -> bool {
    claims.is_some_and(Claims::is_admin)
}

/// Service-provider projection over possibly-absent claims.
#[must_use]
pub fn is_service_provider(claims: Option<&Claims>) -> bool {
    claims.is_some_and(Claims::is_service_provider)
}

/// Obtains claims for an identity from the provider.
#[derive(Clone)]
pub struct ClaimsResolver {
    provider: Arc<dyn IdentityProvider>,
}

impl ClaimsResolver {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self { provider }
    }

    /// Resolve claims for `identity`; `forced` requests a fresh grant.
    ///
    /// # Errors
    ///
    /// Returns the provider's [`ClaimsError`] unchanged.
    pub async fn resolve(&self, identity: &Identity, forced: bool) -> Result<Claims, ClaimsError> {
        let raw = self.provider.get_claims(identity, forced).await?;
        let claims = Claims::from_raw(&raw);
        debug!(identity = %identity.id, forced, claims = claims.len(), "claims resolved");
        Ok(claims)
    }
}

#[cfg(test)]
#[path = "claims_test.rs"]
mod tests;
