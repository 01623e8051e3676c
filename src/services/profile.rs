//! Profile loading with write-through to local storage.
//!
//! DESIGN
//! ======
//! The profile document lives in the store under the identity id. Every
//! successful read is copied to `userProfile` so the next cold start can
//! show something before the network round trip completes. The copy is
//! tagged with its owner and only handed back for that same identity.
//!
//! ERROR HANDLING
//! ==============
//! A missing document is a normal outcome (`Ok(None)`). Transport failures
//! are returned to the manager, which logs them and keeps whatever profile
//! it already had.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ProfileLoadError;
use crate::ports::document::{Document, DocumentStore, merge_into};
use crate::ports::storage::{KeyValueStore, keys, load_json, save_json};

/// User profile record: a display name plus arbitrary fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub fields: Document,
}

impl Profile {
    /// Decode a store document.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileLoadError::Malformed`] when known fields have the wrong type.
    pub fn from_document(document: Document) -> Result<Self, ProfileLoadError> {
        serde_json::from_value(serde_json::Value::Object(document))
            .map_err(|e| ProfileLoadError::Malformed(e.to_string()))
    }

    #[must_use]
    pub fn to_document(&self) -> Document {
        let mut document = self.fields.clone();
        if let Some(name) = &self.name {
            document.insert("name".to_owned(), serde_json::Value::String(name.clone()));
        }
        document
    }

    /// This profile with `patch` shallow-merged on top.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileLoadError::Malformed`] if the patch breaks a typed field.
    pub fn merged(&self, patch: &Document) -> Result<Self, ProfileLoadError> {
        let mut document = self.to_document();
        merge_into(&mut document, patch);
        Self::from_document(document)
    }
}

/// Owner-tagged quick-access copy stored under `userProfile`.
#[derive(Debug, Serialize, Deserialize)]
struct CachedProfile {
    owner: String,
    profile: Profile,
}

/// Reads and writes profile documents for identities.
#[derive(Clone)]
pub struct ProfileLoader {
    store: Arc<dyn DocumentStore>,
    storage: Arc<dyn KeyValueStore>,
    collection: String,
}

impl ProfileLoader {
    pub fn new(store: Arc<dyn DocumentStore>, storage: Arc<dyn KeyValueStore>, collection: impl Into<String>) -> Self {
        Self { store, storage, collection: collection.into() }
    }

    /// Read the profile for `identity_id`. `Ok(None)` when no document exists.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileLoadError`] on transport failure or a malformed document.
    pub async fn load(&self, identity_id: &str) -> Result<Option<Profile>, ProfileLoadError> {
        let Some(document) = self.store.get(&self.collection, identity_id).await? else {
            debug!(identity = %identity_id, collection = %self.collection, "no profile document");
            return Ok(None);
        };
        let profile = Profile::from_document(document)?;
        self.remember(identity_id, &profile);
        Ok(Some(profile))
    }

    /// Merge `patch` into the stored document, returning `base` with the
    /// patch applied. Nothing is written if the patch is malformed.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileLoadError`] on a malformed patch or store failure.
    pub async fn update(&self, identity_id: &str, base: &Profile, patch: &Document) -> Result<Profile, ProfileLoadError> {
        let updated = base.merged(patch)?;
        self.store
            .merge(&self.collection, identity_id, patch)
            .await?;
        self.remember(identity_id, &updated);
        Ok(updated)
    }

    /// Quick-access copy from local storage, only if it belongs to `identity_id`.
    #[must_use]
    pub fn cached(&self, identity_id: &str) -> Option<Profile> {
        match load_json::<CachedProfile>(self.storage.as_ref(), keys::USER_PROFILE) {
            Ok(Some(cached)) if cached.owner == identity_id => Some(cached.profile),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "ignoring unreadable cached profile");
                None
            }
        }
    }

    /// Write the quick-access copy. Failures are logged only.
    pub fn remember(&self, identity_id: &str, profile: &Profile) {
        let cached = CachedProfile { owner: identity_id.to_owned(), profile: profile.clone() };
        if let Err(e) = save_json(self.storage.as_ref(), keys::USER_PROFILE, &cached) {
            warn!(identity = %identity_id, error = %e, "profile write-through failed");
        }
    }

    /// Drop the quick-access copy.
    pub fn forget(&self) {
        if let Err(e) = self.storage.remove(keys::USER_PROFILE) {
            warn!(error = %e, "failed to clear cached profile");
        }
    }
}

#[cfg(test)]
#[path = "profile_test.rs"]
mod tests;
