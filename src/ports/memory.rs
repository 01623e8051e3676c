//! In-memory identity provider and document store.
//!
//! DESIGN
//! ======
//! Behaves like a hosted provider from the client's point of view: sign-in
//! and sign-out push notifications to every handler, new handlers receive
//! the current identity immediately, and claims tokens are cached per
//! identity until a forced refresh. Server-side claim changes made through
//! [`MemoryIdentityProvider::set_claims`] stay invisible to unforced reads,
//! which is the staleness window real providers have.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use crate::error::{AuthError, ClaimsError, DocumentError};
use crate::ports::document::{Document, DocumentStore, merge_into};
use crate::ports::provider::{ChangeHandler, Identity, IdentityProvider, RawClaims, SignIn, Subscription};
use crate::util::lock;

// =============================================================================
// IDENTITY PROVIDER
// =============================================================================

struct Account {
    password: String,
    identity: Identity,
    claims: RawClaims,
}

#[derive(Default)]
struct ProviderState {
    /// Accounts keyed by lowercase email.
    accounts: HashMap<String, Account>,
    current: Option<Identity>,
    handlers: HashMap<u64, ChangeHandler>,
    next_handler_id: u64,
    /// Last token-issued claims per identity id.
    tokens: HashMap<String, RawClaims>,
    offline: bool,
    fail_sign_out: bool,
}

impl ProviderState {
    fn account_for(&self, identity_id: &str) -> Option<&Account> {
        self.accounts
            .values()
            .find(|a| a.identity.id == identity_id)
    }
}

/// In-process identity provider with email/password accounts.
#[derive(Clone, Default)]
pub struct MemoryIdentityProvider {
    state: Arc<Mutex<ProviderState>>,
}

impl MemoryIdentityProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account and return its identity.
    pub fn add_account(&self, email: &str, password: &str, claims: RawClaims) -> Identity {
        let identity = Identity::new(Uuid::new_v4().to_string()).with_email(email);
        let account = Account { password: password.to_owned(), identity: identity.clone(), claims };
        lock(&self.state)
            .accounts
            .insert(email.to_lowercase(), account);
        identity
    }

    /// Change an account's claims server-side. Cached tokens keep the old
    /// claims until the next forced refresh.
    pub fn set_claims(&self, identity_id: &str, claims: RawClaims) {
        let mut state = lock(&self.state);
        if let Some(account) = state
            .accounts
            .values_mut()
            .find(|a| a.identity.id == identity_id)
        {
            account.claims = claims;
        }
    }

    /// Simulate the provider being unreachable for every call.
    pub fn set_offline(&self, offline: bool) {
        lock(&self.state).offline = offline;
    }

    /// Make `sign_out` fail while leaving the provider reachable otherwise.
    pub fn set_sign_out_failure(&self, fail: bool) {
        lock(&self.state).fail_sign_out = fail;
    }

    /// Push a change notification as if the provider detected it
    /// (token expiry, sign-in in another tab, ...).
    pub fn emit(&self, identity: Option<Identity>) {
        lock(&self.state).current.clone_from(&identity);
        self.notify(identity);
    }

    /// Identity the provider currently considers signed in.
    #[must_use]
    pub fn current(&self) -> Option<Identity> {
        lock(&self.state).current.clone()
    }

    /// Number of registered change handlers.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        lock(&self.state).handlers.len()
    }

    fn notify(&self, identity: Option<Identity>) {
        // Handlers run outside the lock; they may call back into the provider.
        let handlers: Vec<ChangeHandler> = lock(&self.state)
            .handlers
            .values()
            .cloned()
            .collect();
        debug!(handlers = handlers.len(), signed_in = identity.is_some(), "provider notification");
        for handler in handlers {
            handler(identity.clone());
        }
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn authenticate(&self, email: &str, password: &str) -> Result<SignIn, AuthError> {
        let sign_in = {
            let mut state = lock(&self.state);
            if state.offline {
                return Err(AuthError::unavailable("identity provider unreachable"));
            }
            let Some(account) = state.accounts.get(&email.to_lowercase()) else {
                return Err(AuthError::invalid_credential());
            };
            if account.password != password {
                return Err(AuthError::invalid_credential());
            }
            let identity = account.identity.clone();
            let claims = account.claims.clone();
            state
                .tokens
                .insert(identity.id.clone(), claims.clone());
            state.current = Some(identity.clone());
            SignIn { identity, raw_claims: Some(claims) }
        };
        self.notify(Some(sign_in.identity.clone()));
        Ok(sign_in)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        {
            let mut state = lock(&self.state);
            if state.offline || state.fail_sign_out {
                return Err(AuthError::unavailable("sign-out request failed"));
            }
            if let Some(identity) = state.current.take() {
                state.tokens.remove(&identity.id);
            }
        }
        self.notify(None);
        Ok(())
    }

    fn subscribe(&self, handler: ChangeHandler) -> Subscription {
        let (id, current) = {
            let mut state = lock(&self.state);
            let id = state.next_handler_id;
            state.next_handler_id += 1;
            state.handlers.insert(id, Arc::clone(&handler));
            (id, state.current.clone())
        };
        handler(current);

        let weak: Weak<Mutex<ProviderState>> = Arc::downgrade(&self.state);
        Subscription::new(move || {
            if let Some(state) = weak.upgrade() {
                lock(&state).handlers.remove(&id);
            }
        })
    }

    async fn get_claims(&self, identity: &Identity, force_refresh: bool) -> Result<RawClaims, ClaimsError> {
        let mut state = lock(&self.state);
        if state.offline {
            return Err(ClaimsError::Fetch("identity provider unreachable".into()));
        }
        if !force_refresh {
            if let Some(cached) = state.tokens.get(&identity.id) {
                return Ok(cached.clone());
            }
        }
        let Some(account) = state.account_for(&identity.id) else {
            return Err(ClaimsError::NoToken(identity.id.clone()));
        };
        let fresh = account.claims.clone();
        state
            .tokens
            .insert(identity.id.clone(), fresh.clone());
        Ok(fresh)
    }
}

// =============================================================================
// DOCUMENT STORE
// =============================================================================

#[derive(Default)]
struct StoreState {
    documents: HashMap<(String, String), Document>,
    unavailable: bool,
}

/// In-process [`DocumentStore`].
#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    state: Arc<Mutex<StoreState>>,
}

impl MemoryDocumentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a document.
    pub fn insert(&self, collection: &str, id: &str, document: Document) {
        lock(&self.state)
            .documents
            .insert((collection.to_owned(), id.to_owned()), document);
    }

    /// Read a document directly, bypassing availability simulation.
    #[must_use]
    pub fn document(&self, collection: &str, id: &str) -> Option<Document> {
        lock(&self.state)
            .documents
            .get(&(collection.to_owned(), id.to_owned()))
            .cloned()
    }

    /// Simulate transport failure on every call.
    pub fn set_unavailable(&self, unavailable: bool) {
        lock(&self.state).unavailable = unavailable;
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, DocumentError> {
        let state = lock(&self.state);
        if state.unavailable {
            return Err(DocumentError::Unavailable("document store unreachable".into()));
        }
        Ok(state
            .documents
            .get(&(collection.to_owned(), id.to_owned()))
            .cloned())
    }

    async fn merge(&self, collection: &str, id: &str, patch: &Document) -> Result<(), DocumentError> {
        let mut state = lock(&self.state);
        if state.unavailable {
            return Err(DocumentError::Unavailable("document store unreachable".into()));
        }
        let document = state
            .documents
            .entry((collection.to_owned(), id.to_owned()))
            .or_default();
        merge_into(document, patch);
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
