//! Document store port (user profile records).

use async_trait::async_trait;

use crate::error::DocumentError;

/// A stored document: a JSON object.
pub type Document = serde_json::Map<String, serde_json::Value>;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read `collection/id`; `Ok(None)` when the document does not exist.
    ///
    /// # Errors
    ///
    /// Returns a [`DocumentError`] on transport or permission failure.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, DocumentError>;

    /// Shallow-merge `patch` into `collection/id`, creating it if missing.
    ///
    /// # Errors
    ///
    /// Returns a [`DocumentError`] on transport or permission failure.
    async fn merge(&self, collection: &str, id: &str, patch: &Document) -> Result<(), DocumentError>;
}

/// Shallow merge: top-level keys of `patch` replace those in `target`.
pub fn merge_into(target: &mut Document, patch: &Document) {
    for (key, value) in patch {
        target.insert(key.clone(), value.clone());
    }
}
