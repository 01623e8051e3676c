//! Per-identity user preferences in local storage.
//!
//! Preferences never touch the network. Each identity has its own
//! `preferences_<id>` record; a missing record is replaced by the defaults
//! (`light` / `en` / notifications on) and persisted.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::PreferenceError;
use crate::ports::provider::Identity;
use crate::ports::storage::{KeyValueStore, keys, load_json, save_json};

/// UI theme. Names this client does not know are carried through unchanged,
/// so a record written by a newer client loads and saves intact.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    Other(String),
}

impl From<String> for Theme {
    fn from(name: String) -> Self {
        match name.as_str() {
            "light" => Self::Light,
            "dark" => Self::Dark,
            _ => Self::Other(name),
        }
    }
}

impl From<Theme> for String {
    fn from(theme: Theme) -> Self {
        match theme {
            Theme::Light => "light".to_owned(),
            Theme::Dark => "dark".to_owned(),
            Theme::Other(name) => name,
        }
    }
}

/// Missing fields take their defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub theme: Theme,
    pub language: String,
    pub notifications: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self { theme: Theme::Light, language: "en".to_owned(), notifications: true }
    }
}

/// Identity-scoped preference persistence.
#[derive(Clone)]
pub struct PreferenceStore {
    storage: Arc<dyn KeyValueStore>,
}

impl PreferenceStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    /// Preferences for `identity_id`, falling back to defaults.
    ///
    /// Absent records are seeded with the defaults. Unreadable records are
    /// left in place and the defaults are returned.
    #[must_use]
    pub fn load(&self, identity_id: &str) -> Preferences {
        let key = keys::preferences(identity_id);
        match load_json::<Preferences>(self.storage.as_ref(), &key) {
            Ok(Some(preferences)) => preferences,
            Ok(None) => {
                let defaults = Preferences::default();
                if let Err(e) = save_json(self.storage.as_ref(), &key, &defaults) {
                    warn!(identity = %identity_id, error = %e, "could not persist default preferences");
                } else {
                    debug!(identity = %identity_id, "seeded default preferences");
                }
                defaults
            }
            Err(e) => {
                warn!(identity = %identity_id, error = %e, "stored preferences unreadable; using defaults");
                Preferences::default()
            }
        }
    }

    /// Persist `preferences` for `identity_id`, which must be the bound identity.
    ///
    /// # Errors
    ///
    /// [`PreferenceError::NotBound`] with no identity, [`PreferenceError::IdentityMismatch`]
    /// when `identity_id` is not the bound one, or the storage failure.
    pub fn save(
        &self,
        bound: Option<&Identity>,
        identity_id: &str,
        preferences: &Preferences,
    ) -> Result<(), PreferenceError> {
        let Some(bound) = bound else {
            return Err(PreferenceError::NotBound);
        };
        if bound.id != identity_id {
            return Err(PreferenceError::IdentityMismatch { bound: bound.id.clone(), requested: identity_id.to_owned() });
        }
        save_json(self.storage.as_ref(), &keys::preferences(identity_id), preferences)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "preferences_test.rs"]
mod tests;
