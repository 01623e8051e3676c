//! Identity provider port.
//!
//! DESIGN
//! ======
//! The provider issues credentials, pushes session-change notifications and
//! mints claims tokens. Notifications are modelled as an explicit handler
//! registration returning a [`Subscription`]; dropping or unsubscribing the
//! handle detaches the handler.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, ClaimsError};

/// Raw claims payload as minted by the provider.
pub type RawClaims = serde_json::Map<String, serde_json::Value>;

/// Callback invoked with the provider's current identity (`None` when signed out).
pub type ChangeHandler = Arc<dyn Fn(Option<Identity>) + Send + Sync>;

/// Opaque reference to an authenticated principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Provider-assigned stable user id.
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), email: None, display_name: None }
    }

    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Successful sign-in: the identity and the claims minted with its first token.
#[derive(Debug, Clone, PartialEq)]
pub struct SignIn {
    pub identity: Identity,
    pub raw_claims: Option<RawClaims>,
}

/// Handle for an active change-stream registration.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Wrap the provider-specific detach action.
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self { cancel: Some(Box::new(cancel)) }
    }

    /// Detach the handler now.
    pub fn unsubscribe(mut self) {
        self.detach();
    }

    fn detach(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// Identity provider capability.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns an [`AuthError`] for rejected credentials or an unreachable provider.
    async fn authenticate(&self, email: &str, password: &str) -> Result<SignIn, AuthError>;

    /// Sign out the current identity.
    ///
    /// # Errors
    ///
    /// Returns an [`AuthError`] if the provider could not end the session.
    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Register `handler` for identity changes. Providers deliver the current
    /// state to a new handler as its first notification.
    fn subscribe(&self, handler: ChangeHandler) -> Subscription;

    /// Claims for `identity`. `force_refresh` bypasses any cached token.
    ///
    /// # Errors
    ///
    /// Returns a [`ClaimsError`] if no token could be obtained.
    async fn get_claims(&self, identity: &Identity, force_refresh: bool) -> Result<RawClaims, ClaimsError>;
}

#[cfg(test)]
#[path = "provider_test.rs"]
mod tests;
