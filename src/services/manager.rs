//! Session manager: the single owner of the client's session.
//!
//! SYSTEM CONTEXT
//! ==============
//! The identity provider pushes "who is signed in" notifications at any
//! time: on startup, on sign-in and sign-out, on token expiry, or from
//! another tab. The manager turns each one into a published [`Session`]
//! by resolving claims, loading the profile and reading preferences, then
//! hands snapshots to the navigation guard and UI readers.
//!
//! DESIGN
//! ======
//! - One provider subscription per manager. `initialize` is idempotent and
//!   `shutdown` releases the subscription so it can be taken again.
//! - The change handler runs synchronously inside the provider. An absent
//!   identity clears the session on the spot. A present identity starts a
//!   new cache generation (status `Loading`) and queues the identity for
//!   the notification worker.
//! - A single worker task drains the queue one notification at a time:
//!   claims, then profile, then preferences, then one generation-tagged
//!   publish. A write tagged with a superseded generation is dropped.
//! - `login` starts its own generation after the provider accepts the
//!   credentials, so the sign-in echo already queued for the worker is
//!   superseded and both paths converge on the same session.
//!
//! ERROR HANDLING
//! ==============
//! Credential and sign-out failures are returned to the caller untouched.
//! Enrichment failures during a sync are logged and recovered: missing
//! claims stay absent, a failed profile read keeps the previous profile,
//! unreadable preferences fall back to defaults.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::SessionConfig;
use crate::error::{AuthError, SessionError};
use crate::guard::{Decision, NavigationGuard, Route};
use crate::ports::document::{Document, DocumentStore};
use crate::ports::provider::{ChangeHandler, Identity, IdentityProvider, Subscription};
use crate::ports::storage::KeyValueStore;
use crate::services::claims::{Claims, ClaimsResolver};
use crate::services::preferences::{PreferenceStore, Preferences};
use crate::services::profile::{Profile, ProfileLoader};
use crate::state::cache::{LocalField, Revisions, SessionCache, SessionSnapshot};
use crate::state::session::{Session, SessionStatus};
use crate::util::{lock, now};

/// Outcome of a successful [`SessionManager::login`].
#[derive(Debug, Clone, PartialEq)]
pub struct LoginResult {
    pub success: bool,
    pub identity: Identity,
    pub claims: Option<Claims>,
    pub profile: Option<Profile>,
    /// False when a newer identity event superseded this sign-in before its
    /// results could be published.
    pub published: bool,
}

/// Queued work for the notification worker.
#[derive(Debug)]
struct Notification {
    generation: u64,
    identity: Identity,
}

/// Live subscription and worker, present between `initialize` and `shutdown`.
struct Runtime {
    subscription: Subscription,
    worker: JoinHandle<()>,
}

struct Inner {
    config: SessionConfig,
    provider: Arc<dyn IdentityProvider>,
    cache: SessionCache,
    claims: ClaimsResolver,
    profiles: ProfileLoader,
    preferences: PreferenceStore,
    guard: NavigationGuard,
    initialized: AtomicBool,
    runtime: Mutex<Option<Runtime>>,
}

/// Cloneable handle to the client's single session.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    pub fn new(
        config: SessionConfig,
        provider: Arc<dyn IdentityProvider>,
        documents: Arc<dyn DocumentStore>,
        storage: Arc<dyn KeyValueStore>,
    ) -> Self {
        let inner = Inner {
            claims: ClaimsResolver::new(Arc::clone(&provider)),
            profiles: ProfileLoader::new(documents, Arc::clone(&storage), config.profile_collection.clone()),
            preferences: PreferenceStore::new(Arc::clone(&storage)),
            cache: SessionCache::new(storage),
            guard: config.guard(),
            config,
            provider,
            initialized: AtomicBool::new(false),
            runtime: Mutex::new(None),
        };
        Self { inner: Arc::new(inner) }
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Subscribe to the identity provider and start the notification worker.
    /// Calling this again while initialized does nothing.
    ///
    /// Must be called from within a tokio runtime.
    pub fn initialize(&self) {
        if self.inner.initialized.swap(true, Ordering::SeqCst) {
            debug!("session manager already initialized");
            return;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(Arc::downgrade(&self.inner), rx));
        info!(
            last_known_authenticated = self.inner.cache.last_known_authenticated(),
            "subscribing to identity provider"
        );
        let subscription = self
            .inner
            .provider
            .subscribe(change_handler(Arc::downgrade(&self.inner), tx));
        *lock(&self.inner.runtime) = Some(Runtime { subscription, worker });
    }

    /// Drop the provider subscription and stop the worker.
    pub fn shutdown(&self) {
        let runtime = lock(&self.inner.runtime).take();
        if let Some(Runtime { subscription, worker }) = runtime {
            subscription.unsubscribe();
            worker.abort();
            info!("session manager shut down");
        }
        self.inner.initialized.store(false, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.inner.initialized.load(Ordering::SeqCst)
    }

    // =========================================================================
    // READS
    // =========================================================================

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.cache.snapshot()
    }

    #[must_use]
    pub fn session(&self) -> Session {
        self.inner.cache.session()
    }

    /// Receiver yielding every published snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.cache.subscribe()
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn guard(&self) -> &NavigationGuard {
        &self.inner.guard
    }

    /// Guard decision for `target` against the current snapshot.
    #[must_use]
    pub fn decide(&self, target: &Route) -> Decision {
        self.inner.guard.decide(target, &self.inner.cache.session())
    }

    // =========================================================================
    // COMMANDS
    // =========================================================================

    /// Sign in and synchronously enrich the new session with fresh claims,
    /// profile and preferences.
    ///
    /// # Errors
    ///
    /// Returns the provider's [`AuthError`]; the session is left as it was.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResult, AuthError> {
        let inner = &self.inner;
        let sign_in = match inner.provider.authenticate(email, password).await {
            Ok(sign_in) => sign_in,
            Err(e) => {
                error!(code = %e.code, error = %e, "login failed");
                return Err(e);
            }
        };

        let identity = sign_in.identity;
        let generation = inner.cache.advance(|s| s.begin_sync(identity.clone(), now()));
        let seen = inner.cache.revisions();
        info!(identity = %identity.id, generation, "signed in");

        let claims = match inner.claims.resolve(&identity, true).await {
            Ok(claims) => Some(claims),
            Err(e) => {
                warn!(identity = %identity.id, error = %e, "forced claims refresh failed; using sign-in token");
                sign_in.raw_claims.as_ref().map(Claims::from_raw)
            }
        };
        let profile = inner.load_profile(&identity.id).await;
        let preferences = inner.preferences.load(&identity.id);

        let published = inner.publish(generation, seen, claims.clone(), profile.clone(), preferences);
        Ok(LoginResult { success: true, identity, claims, profile, published })
    }

    /// Sign out, then clear the local session unless the provider's
    /// notification already did.
    ///
    /// # Errors
    ///
    /// Returns the provider's [`AuthError`]; local state is not cleared and
    /// a later provider notification decides the outcome.
    pub async fn logout(&self) -> Result<(), AuthError> {
        if let Err(e) = self.inner.provider.sign_out().await {
            error!(code = %e.code, error = %e, "logout failed");
            return Err(e);
        }
        if self.inner.cache.session().is_anonymous() {
            debug!("session already cleared by provider notification");
        } else {
            self.inner.clear_local("sign-out");
        }
        Ok(())
    }

    /// Merge `patch` into the signed-in user's profile document and the
    /// published session.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotAuthenticated`] without an identity, the store
    /// failure, or [`SessionError::IdentityChanged`] if the identity changed
    /// while the write was in flight.
    pub async fn update_profile(&self, patch: &Document) -> Result<Profile, SessionError> {
        let inner = &self.inner;
        let session = inner.cache.session();
        let Some(identity) = session.identity else {
            return Err(SessionError::NotAuthenticated);
        };
        let base = session.profile.unwrap_or_default();

        let updated = inner.profiles.update(&identity.id, &base, patch).await?;
        let local = updated.clone();
        if !inner.cache.write_local(
            LocalField::Profile,
            |snapshot| snapshot.session.identity_id() == Some(identity.id.as_str()),
            move |s| s.profile = Some(local),
        ) {
            return Err(SessionError::IdentityChanged);
        }
        info!(identity = %identity.id, fields = patch.len(), "profile updated");
        Ok(updated)
    }

    /// Force a fresh claims grant for the bound identity. Returns the claims
    /// now published, which are the previous ones if the provider failed.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotAuthenticated`] without an identity,
    /// [`SessionError::SyncInProgress`] while a sync is running, or
    /// [`SessionError::IdentityChanged`] if the identity changed meanwhile.
    pub async fn refresh_claims(&self) -> Result<Option<Claims>, SessionError> {
        let inner = &self.inner;
        let snapshot = inner.cache.snapshot();
        let Some(identity) = snapshot.session.identity else {
            return Err(SessionError::NotAuthenticated);
        };
        if snapshot.session.status == SessionStatus::Loading {
            return Err(SessionError::SyncInProgress);
        }
        let generation = snapshot.generation;
        if !inner
            .cache
            .apply(generation, |s| s.status = SessionStatus::Loading)
        {
            return Err(SessionError::IdentityChanged);
        }
        let mut pending = PendingRefresh { cache: &inner.cache, generation, settled: false };

        let fresh = match inner.claims.resolve(&identity, true).await {
            Ok(claims) => Some(claims),
            Err(e) => {
                warn!(identity = %identity.id, error = %e, "claims refresh failed; keeping previous claims");
                None
            }
        };

        let mut published = None;
        let applied = inner.cache.apply(generation, |s| {
            if let Some(claims) = fresh {
                s.claims = Some(claims);
            }
            s.status = SessionStatus::Authenticated;
            s.last_synced_at = Some(now());
            published.clone_from(&s.claims);
        });
        pending.settled = true;
        if !applied {
            return Err(SessionError::IdentityChanged);
        }
        debug!(identity = %identity.id, generation, "claims refreshed");
        Ok(published)
    }

    /// Re-read the bound identity's profile document and publish it.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotAuthenticated`] without an identity, the store
    /// failure, or [`SessionError::IdentityChanged`].
    pub async fn reload_profile(&self) -> Result<Option<Profile>, SessionError> {
        let inner = &self.inner;
        let snapshot = inner.cache.snapshot();
        let Some(identity) = snapshot.session.identity else {
            return Err(SessionError::NotAuthenticated);
        };

        let profile = inner.profiles.load(&identity.id).await?;
        let local = profile.clone();
        if !inner.cache.write_local(
            LocalField::Profile,
            |current| current.generation == snapshot.generation,
            move |s| s.profile = local,
        ) {
            return Err(SessionError::IdentityChanged);
        }
        Ok(profile)
    }

    /// Persist `preferences` for the bound identity and publish them.
    ///
    /// # Errors
    ///
    /// [`SessionError::Preference`] when no identity is bound or storage
    /// fails, [`SessionError::IdentityChanged`] if the identity changed.
    pub fn save_preferences(&self, preferences: Preferences) -> Result<(), SessionError> {
        let inner = &self.inner;
        let session = inner.cache.session();
        let bound = session.identity.as_ref();
        let identity_id = bound.map(|i| i.id.clone()).unwrap_or_default();

        inner.preferences.save(bound, &identity_id, &preferences)?;
        if !inner.cache.write_local(
            LocalField::Preferences,
            |snapshot| snapshot.session.identity_id() == Some(identity_id.as_str()),
            move |s| s.preferences = Some(preferences),
        ) {
            return Err(SessionError::IdentityChanged);
        }
        debug!(identity = %identity_id, "preferences saved");
        Ok(())
    }
}

// =============================================================================
// SYNC
// =============================================================================

impl Inner {
    /// Enrich `identity` for `generation` and publish, unless superseded.
    async fn sync_identity(&self, generation: u64, identity: Identity) {
        let seen = self.cache.revisions();
        if self.cache.session().profile.is_none() {
            if let Some(cached) = self.profiles.cached(&identity.id) {
                self.cache.apply(generation, move |s| s.profile = Some(cached));
            }
        }

        let claims = match self.claims.resolve(&identity, false).await {
            Ok(claims) => Some(claims),
            Err(e) => {
                warn!(identity = %identity.id, generation, error = %e, "claims resolution failed");
                None
            }
        };
        if !self.cache.is_current(generation) {
            debug!(identity = %identity.id, generation, "sync superseded after claims");
            return;
        }

        let profile = self.load_profile(&identity.id).await;
        if !self.cache.is_current(generation) {
            debug!(identity = %identity.id, generation, "sync superseded after profile");
            return;
        }

        let preferences = self.preferences.load(&identity.id);
        if self.publish(generation, seen, claims, profile, preferences) {
            info!(identity = %identity.id, generation, "session synchronized");
        }
    }

    /// Load the profile, keeping the currently published one (or the
    /// warm-start copy) for the same identity when the store fails.
    async fn load_profile(&self, identity_id: &str) -> Option<Profile> {
        match self.profiles.load(identity_id).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!(identity = %identity_id, error = %e, "profile load failed; keeping previous profile");
                let session = self.cache.session();
                if session.identity_id() == Some(identity_id) && session.profile.is_some() {
                    session.profile
                } else {
                    self.profiles.cached(identity_id)
                }
            }
        }
    }

    /// Publish a completed sync for `generation`. Profile or preferences
    /// written directly since `seen` was taken win over the loaded values.
    fn publish(
        &self,
        generation: u64,
        seen: Revisions,
        claims: Option<Claims>,
        profile: Option<Profile>,
        preferences: Preferences,
    ) -> bool {
        let mut kept_profile = None;
        let applied = self.cache.apply_with_revisions(generation, |s, current| {
            let profile = if current.written_since(&seen, LocalField::Profile) {
                kept_profile = s.identity_id().map(str::to_owned).zip(s.profile.clone());
                s.profile.take()
            } else {
                profile
            };
            let preferences = match s.preferences.take() {
                Some(local) if current.written_since(&seen, LocalField::Preferences) => local,
                _ => preferences,
            };
            s.complete_sync(claims, profile, preferences, now());
        });
        if !applied {
            debug!(generation, "discarding superseded session write");
            return false;
        }
        if let Some((identity_id, profile)) = kept_profile {
            debug!(identity = %identity_id, generation, "kept profile written during sync");
            self.profiles.remember(&identity_id, &profile);
        }
        true
    }

    fn clear_local(&self, reason: &str) {
        let generation = self.cache.advance(|s| s.clear(now()));
        self.profiles.forget();
        info!(generation, reason, "session cleared");
    }
}

/// Marks the session `Loading` for a claims refresh. If the refresh future is
/// dropped before it settles, the previous claims are republished as
/// `Authenticated`.
struct PendingRefresh<'a> {
    cache: &'a SessionCache,
    generation: u64,
    settled: bool,
}

impl Drop for PendingRefresh<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let restored = self.cache.apply(self.generation, |s| {
            if s.status == SessionStatus::Loading {
                s.status = SessionStatus::Authenticated;
            }
        });
        if restored {
            warn!(generation = self.generation, "claims refresh abandoned; keeping previous claims");
        }
    }
}

fn change_handler(inner: Weak<Inner>, tx: mpsc::UnboundedSender<Notification>) -> ChangeHandler {
    Arc::new(move |identity: Option<Identity>| {
        let Some(inner) = inner.upgrade() else {
            return;
        };
        match identity {
            None => inner.clear_local("provider reported no identity"),
            Some(identity) => {
                let generation = inner.cache.advance(|s| s.begin_sync(identity.clone(), now()));
                debug!(identity = %identity.id, generation, "queued identity sync");
                if let Err(e) = tx.send(Notification { generation, identity }) {
                    warn!(generation = e.0.generation, "notification worker stopped; dropping sync");
                }
            }
        }
    })
}

async fn run_worker(inner: Weak<Inner>, mut rx: mpsc::UnboundedReceiver<Notification>) {
    while let Some(notification) = rx.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        if !inner.cache.is_current(notification.generation) {
            debug!(generation = notification.generation, "skipping superseded notification");
            continue;
        }
        inner
            .sync_identity(notification.generation, notification.identity)
            .await;
    }
    debug!("notification worker stopped");
}

#[cfg(test)]
#[path = "manager_test.rs"]
mod tests;
