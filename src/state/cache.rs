//! Versioned, generation-tagged session cache.
//!
//! DESIGN
//! ======
//! The current [`Session`] lives in a `tokio::sync::watch` channel so readers
//! always see a complete snapshot and can await changes. Two counters ride
//! along with it:
//!
//! - `generation` moves only on identity-affecting events (notification,
//!   sign-in, sign-out). Asynchronous work captures the generation it was
//!   started for and its writes are discarded once a newer one exists.
//! - `version` moves on every published change, for readers that only care
//!   whether something changed.
//!
//! The `isAuthenticated` flag in local storage is written from inside the
//! same update, so it always matches the status of some published snapshot.
//! It is a warm-start hint only and nothing in this crate trusts it for
//! access decisions.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::warn;

use crate::ports::storage::{KeyValueStore, keys};
use crate::state::session::{Session, SessionStatus};

/// A published session state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    pub generation: u64,
    pub version: u64,
    pub revisions: Revisions,
    pub session: Session,
}

/// Session fields that callers write directly, outside a sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalField {
    Profile,
    Preferences,
}

/// Count of direct writes per [`LocalField`]. A sync compares the counts it
/// saw when it started against the counts at publish time; a field written
/// in between keeps the direct write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Revisions {
    pub profile: u64,
    pub preferences: u64,
}

impl Revisions {
    fn bump(&mut self, field: LocalField) {
        match field {
            LocalField::Profile => self.profile += 1,
            LocalField::Preferences => self.preferences += 1,
        }
    }

    /// Whether `field` was written directly since `earlier` was taken.
    #[must_use]
    pub fn written_since(&self, earlier: &Self, field: LocalField) -> bool {
        match field {
            LocalField::Profile => self.profile != earlier.profile,
            LocalField::Preferences => self.preferences != earlier.preferences,
        }
    }
}

pub struct SessionCache {
    tx: watch::Sender<SessionSnapshot>,
    storage: Arc<dyn KeyValueStore>,
}

impl SessionCache {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        let (tx, _rx) = watch::channel(SessionSnapshot::default());
        Self { tx, storage }
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.tx.borrow().clone()
    }

    #[must_use]
    pub fn session(&self) -> Session {
        self.tx.borrow().session.clone()
    }

    /// Receiver that observes every published snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.tx.subscribe()
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.tx.borrow().generation
    }

    #[must_use]
    pub fn revisions(&self) -> Revisions {
        self.tx.borrow().revisions
    }

    #[must_use]
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation() == generation
    }

    /// Start a new generation and apply `update` to it. Returns the new
    /// generation for tagging follow-up writes.
    pub fn advance(&self, update: impl FnOnce(&mut Session)) -> u64 {
        let mut generation = 0;
        self.tx.send_modify(|snapshot| {
            snapshot.generation += 1;
            snapshot.version += 1;
            update(&mut snapshot.session);
            self.persist_flag(snapshot.session.status);
            generation = snapshot.generation;
        });
        generation
    }

    /// Apply `update` only if `generation` is still current. Returns whether
    /// the write was published.
    pub fn apply(&self, generation: u64, update: impl FnOnce(&mut Session)) -> bool {
        self.apply_with_revisions(generation, |session, _| update(session))
    }

    /// Like [`Self::apply`], but `update` also sees the current direct-write
    /// revisions.
    pub fn apply_with_revisions(&self, generation: u64, update: impl FnOnce(&mut Session, Revisions)) -> bool {
        self.tx.send_if_modified(|snapshot| {
            if snapshot.generation != generation {
                return false;
            }
            snapshot.version += 1;
            update(&mut snapshot.session, snapshot.revisions);
            self.persist_flag(snapshot.session.status);
            true
        })
    }

    /// Direct write to `field`, applied only if `predicate` holds for the
    /// current snapshot. Does not start a new generation; bumps the field's
    /// revision so an in-flight sync does not overwrite it.
    pub fn write_local(
        &self,
        field: LocalField,
        predicate: impl FnOnce(&SessionSnapshot) -> bool,
        update: impl FnOnce(&mut Session),
    ) -> bool {
        self.tx.send_if_modified(|snapshot| {
            if !predicate(snapshot) {
                return false;
            }
            snapshot.version += 1;
            snapshot.revisions.bump(field);
            update(&mut snapshot.session);
            self.persist_flag(snapshot.session.status);
            true
        })
    }

    /// Whether the previous run ended authenticated, per local storage.
    #[must_use]
    pub fn last_known_authenticated(&self) -> bool {
        match self.storage.get(keys::IS_AUTHENTICATED) {
            Ok(value) => value.as_deref() == Some("true"),
            Err(e) => {
                warn!(error = %e, "could not read authentication flag");
                false
            }
        }
    }

    fn persist_flag(&self, status: SessionStatus) {
        let result = match status {
            SessionStatus::Authenticated => self.storage.set(keys::IS_AUTHENTICATED, "true"),
            SessionStatus::Anonymous => self.storage.remove(keys::IS_AUTHENTICATED),
            SessionStatus::Unknown | SessionStatus::Loading => return,
        };
        if let Err(e) = result {
            warn!(error = %e, ?status, "failed to persist authentication flag");
        }
    }
}

#[cfg(test)]
#[path = "cache_test.rs"]
mod tests;
