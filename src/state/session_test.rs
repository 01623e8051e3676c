use serde_json::json;

use super::*;
use crate::util::now;

fn claims(value: serde_json::Value) -> Claims {
    Claims::from_raw(&value.as_object().cloned().unwrap_or_default())
}

fn ada() -> Identity {
    Identity::new("u1").with_email("ada@example.com")
}

fn named(name: &str) -> Profile {
    Profile { name: Some(name.into()), ..Profile::default() }
}

fn authenticated(identity: Identity, claim_json: serde_json::Value) -> Session {
    let mut session = Session::default();
    session.begin_sync(identity, now());
    session.complete_sync(Some(claims(claim_json)), Some(named("Ada")), Preferences::default(), now());
    session
}

// =============================================================================
// Status projections
// =============================================================================

#[test]
fn new_session_is_unknown_and_loading() {
    let session = Session::default();
    assert_eq!(session.status, SessionStatus::Unknown);
    assert!(session.is_loading());
    assert!(!session.is_authenticated());
    assert!(!session.is_anonymous());
    assert!(session.last_synced_at.is_none());
}

#[test]
fn begin_sync_enters_loading_with_identity() {
    let mut session = Session::default();
    session.begin_sync(ada(), now());
    assert_eq!(session.status, SessionStatus::Loading);
    assert_eq!(session.identity_id(), Some("u1"));
    assert!(session.is_loading());
    assert!(session.last_synced_at.is_some());
}

#[test]
fn complete_sync_authenticates() {
    let session = authenticated(ada(), json!({}));
    assert!(session.is_authenticated());
    assert!(!session.is_loading());
    assert_eq!(session.preferences, Some(Preferences::default()));
}

#[test]
fn clear_resets_everything_to_anonymous() {
    let mut session = authenticated(ada(), json!({ "admin": true }));
    session.clear(now());
    assert_eq!(session.status, SessionStatus::Anonymous);
    assert!(session.identity.is_none());
    assert!(session.claims.is_none());
    assert!(session.profile.is_none());
    assert!(session.preferences.is_none());
    assert!(session.last_synced_at.is_some());
}

// =============================================================================
// Re-sync
// =============================================================================

#[test]
fn resync_same_identity_keeps_enrichment_visible() {
    let mut session = authenticated(ada(), json!({ "admin": true }));
    session.begin_sync(ada(), now());
    assert_eq!(session.status, SessionStatus::Loading);
    assert!(session.is_admin());
    assert_eq!(session.user_name(), "Ada");
    assert!(session.preferences.is_some());
}

#[test]
fn sync_for_other_identity_drops_previous_enrichment() {
    let mut session = authenticated(ada(), json!({ "admin": true }));
    session.begin_sync(Identity::new("u2"), now());
    assert_eq!(session.identity_id(), Some("u2"));
    assert!(session.claims.is_none());
    assert!(session.profile.is_none());
    assert!(session.preferences.is_none());
}

// =============================================================================
// Derived values
// =============================================================================

#[test]
fn role_prefers_admin_over_service_provider() {
    let session = authenticated(ada(), json!({ "admin": true, "serviceProvider": true }));
    assert_eq!(session.role(), Role::Admin);
    assert_eq!(session.role().label(), "Admin");
}

#[test]
fn role_service_provider() {
    let session = authenticated(ada(), json!({ "serviceProvider": true }));
    assert_eq!(session.role(), Role::ServiceProvider);
    assert!(!session.is_admin());
}

#[test]
fn role_defaults_to_user_without_claims() {
    let session = Session::default();
    assert_eq!(session.role(), Role::User);
    assert!(!session.is_admin());
    assert!(!session.is_service_provider());
}

#[test]
fn user_name_falls_back_to_email_then_constant() {
    let mut session = Session::default();
    assert_eq!(session.user_name(), FALLBACK_USER_NAME);

    session.begin_sync(ada(), now());
    assert_eq!(session.user_name(), "ada@example.com");
    assert_eq!(session.user_email(), Some("ada@example.com"));

    session.complete_sync(None, Some(named("Ada L.")), Preferences::default(), now());
    assert_eq!(session.user_name(), "Ada L.");
}

#[test]
fn unnamed_profile_uses_email() {
    let mut session = Session::default();
    session.begin_sync(ada(), now());
    session.complete_sync(None, Some(Profile::default()), Preferences::default(), now());
    assert_eq!(session.user_name(), "ada@example.com");
}
