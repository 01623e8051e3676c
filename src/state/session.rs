//! The session record and its derived projections.
//!
//! DESIGN
//! ======
//! `Session` is plain data. Consumers receive clones through the cache's
//! watch channel and read it through the projection methods; only the
//! session manager mutates it, and only through the `pub(crate)` transitions
//! below so the status invariants hold:
//!
//! - `Authenticated` iff an identity is bound and claims resolution ran for it.
//! - `Anonymous` iff no identity is bound, with claims, profile and
//!   preferences cleared.

use time::OffsetDateTime;

use crate::ports::provider::Identity;
use crate::services::claims::{self, Claims};
use crate::services::preferences::Preferences;
use crate::services::profile::Profile;

/// Name shown when neither a profile name nor an email is known.
pub const FALLBACK_USER_NAME: &str = "User";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionStatus {
    /// No provider notification processed yet.
    #[default]
    Unknown,
    /// Identity bound, enrichment in flight.
    Loading,
    Authenticated,
    Anonymous,
}

/// Coarse role derived from claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    ServiceProvider,
    User,
}

impl Role {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::ServiceProvider => "Service Provider",
            Self::User => "User",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub identity: Option<Identity>,
    pub claims: Option<Claims>,
    pub profile: Option<Profile>,
    pub preferences: Option<Preferences>,
    pub status: SessionStatus,
    /// When the last provider notification or sync was applied.
    pub last_synced_at: Option<OffsetDateTime>,
}

impl Session {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }

    /// True until the first notification settles, and while a sync runs.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self.status, SessionStatus::Unknown | SessionStatus::Loading)
    }

    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.status == SessionStatus::Anonymous
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        claims::is_admin(self.claims.as_ref())
    }

    #[must_use]
    pub fn is_service_provider(&self) -> bool {
        claims::is_service_provider(self.claims.as_ref())
    }

    #[must_use]
    pub fn role(&self) -> Role {
        if self.is_admin() {
            Role::Admin
        } else if self.is_service_provider() {
            Role::ServiceProvider
        } else {
            Role::User
        }
    }

    /// Profile name, else identity email, else [`FALLBACK_USER_NAME`].
    #[must_use]
    pub fn user_name(&self) -> &str {
        self.profile
            .as_ref()
            .and_then(|p| p.name.as_deref())
            .or_else(|| self.user_email())
            .unwrap_or(FALLBACK_USER_NAME)
    }

    #[must_use]
    pub fn user_email(&self) -> Option<&str> {
        self.identity.as_ref().and_then(|i| i.email.as_deref())
    }

    #[must_use]
    pub fn identity_id(&self) -> Option<&str> {
        self.identity.as_ref().map(|i| i.id.as_str())
    }

    // =========================================================================
    // TRANSITIONS
    // =========================================================================

    /// Bind `identity` and enter `Loading`. Enrichment for a different
    /// identity is dropped so nothing leaks across accounts.
    pub(crate) fn begin_sync(&mut self, identity: Identity, at: OffsetDateTime) {
        if self.identity_id() != Some(identity.id.as_str()) {
            self.claims = None;
            self.profile = None;
            self.preferences = None;
        }
        self.identity = Some(identity);
        self.status = SessionStatus::Loading;
        self.last_synced_at = Some(at);
    }

    /// Publish enrichment results and enter `Authenticated`.
    pub(crate) fn complete_sync(
        &mut self,
        claims: Option<Claims>,
        profile: Option<Profile>,
        preferences: Preferences,
        at: OffsetDateTime,
    ) {
        self.claims = claims;
        self.profile = profile;
        self.preferences = Some(preferences);
        self.status = SessionStatus::Authenticated;
        self.last_synced_at = Some(at);
    }

    /// Drop the identity and everything derived from it.
    pub(crate) fn clear(&mut self, at: OffsetDateTime) {
        *self = Self { status: SessionStatus::Anonymous, last_synced_at: Some(at), ..Self::default() };
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
