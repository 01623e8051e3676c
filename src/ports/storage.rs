//! Client key-value storage port and JSON helpers.
//!
//! SYSTEM CONTEXT
//! ==============
//! Mirrors browser `localStorage`: string keys, string values, synchronous
//! calls. All persisted session data goes through [`KeyValueStore`] so the
//! backing mechanism can be swapped (browser storage, file, memory).
//!
//! TRADE-OFFS
//! ==========
//! Persistence is a warm-start cache, never the source of truth. Callers log
//! and continue on storage errors rather than failing the session.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::StorageError;
use crate::util::lock;

/// Well-known storage keys.
pub mod keys {
    /// `"true"` while the last published session was authenticated.
    pub const IS_AUTHENTICATED: &str = "isAuthenticated";
    /// JSON quick-access copy of the signed-in user's profile.
    pub const USER_PROFILE: &str = "userProfile";
    /// Prefix for identity-scoped preference records.
    pub const PREFERENCES_PREFIX: &str = "preferences_";

    /// Key holding preferences for `identity_id`.
    #[must_use]
    pub fn preferences(identity_id: &str) -> String {
        format!("{PREFERENCES_PREFIX}{identity_id}")
    }
}

/// String-keyed, string-valued persistent storage.
pub trait KeyValueStore: Send + Sync {
    /// Read the value for `key`, `None` when unset.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Unavailable`] when storage cannot be reached.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::QuotaExceeded`] or [`StorageError::Unavailable`].
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing an unset key succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Unavailable`] when storage cannot be reached.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Load a JSON value stored under `key`.
///
/// # Errors
///
/// Propagates storage failures and returns [`StorageError::Decode`] when the
/// stored text is not valid JSON for `T`.
pub fn load_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>, StorageError> {
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|e| StorageError::Decode { key: key.to_owned(), reason: e.to_string() })
}

/// Save `value` as JSON under `key`.
///
/// # Errors
///
/// Returns [`StorageError::Encode`] if serialization fails, otherwise
/// propagates the store's write error.
pub fn save_json<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<(), StorageError> {
    let raw =
        serde_json::to_string(value).map_err(|e| StorageError::Encode { key: key.to_owned(), reason: e.to_string() })?;
    store.set(key, &raw)
}

// =============================================================================
// IN-MEMORY STORE
// =============================================================================

/// In-process [`KeyValueStore`] with an optional byte quota.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that rejects writes once keys plus values exceed `quota_bytes`.
    #[must_use]
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self { entries: Mutex::new(HashMap::new()), quota_bytes: Some(quota_bytes) }
    }

    /// Sorted list of keys currently stored.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = lock(&self.entries).keys().cloned().collect();
        keys.sort();
        keys
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        lock(&self.entries).contains_key(key)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = lock(&self.entries);
        if let Some(quota) = self.quota_bytes {
            let used: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            if used + key.len() + value.len() > quota {
                return Err(StorageError::QuotaExceeded { key: key.to_owned() });
            }
        }
        entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        lock(&self.entries).remove(key);
        Ok(())
    }
}

#[cfg(test)]
#[path = "storage_test.rs"]
mod tests;
