use super::*;
use crate::ports::provider::Identity;
use crate::services::preferences::Preferences;
use crate::state::session::SessionStatus;
use crate::util::now;

fn guard() -> NavigationGuard {
    NavigationGuard::new("login", "dashboard")
}

fn session(status: SessionStatus) -> Session {
    let mut session = Session::default();
    match status {
        SessionStatus::Unknown => {}
        SessionStatus::Loading => session.begin_sync(Identity::new("u1"), now()),
        SessionStatus::Authenticated => {
            session.begin_sync(Identity::new("u1"), now());
            session.complete_sync(None, None, Preferences::default(), now());
        }
        SessionStatus::Anonymous => session.clear(now()),
    }
    session
}

fn login() -> Route {
    Route::public("login", "/login")
}

fn dashboard() -> Route {
    Route::protected("dashboard", "/dashboard")
}

// =============================================================================
// decide
// =============================================================================

#[test]
fn protected_route_redirects_anonymous_to_login() {
    let decision = guard().decide(&dashboard(), &session(SessionStatus::Anonymous));
    assert_eq!(decision, Decision::Redirect("login".into()));
}

#[test]
fn protected_route_allows_authenticated() {
    assert_eq!(guard().decide(&dashboard(), &session(SessionStatus::Authenticated)), Decision::Allow);
}

#[test]
fn unknown_and_loading_count_as_signed_out() {
    for status in [SessionStatus::Unknown, SessionStatus::Loading] {
        assert_eq!(
            guard().decide(&dashboard(), &session(status)),
            Decision::Redirect("login".into()),
            "{status:?}"
        );
        assert_eq!(guard().decide(&login(), &session(status)), Decision::Allow, "{status:?}");
    }
}

#[test]
fn login_route_sends_authenticated_to_landing() {
    let decision = guard().decide(&login(), &session(SessionStatus::Authenticated));
    assert_eq!(decision, Decision::Redirect("dashboard".into()));
}

#[test]
fn login_route_allows_anonymous() {
    assert_eq!(guard().decide(&login(), &session(SessionStatus::Anonymous)), Decision::Allow);
}

#[test]
fn public_route_always_allowed() {
    let about = Route::public("about", "/about");
    for status in [SessionStatus::Unknown, SessionStatus::Anonymous, SessionStatus::Authenticated] {
        assert_eq!(guard().decide(&about, &session(status)), Decision::Allow);
    }
}

#[test]
fn configured_route_names_are_used() {
    let guard = NavigationGuard::new("sign-in", "home");
    let sign_in = Route::public("sign-in", "/sign-in");
    assert_eq!(guard.decide(&dashboard(), &session(SessionStatus::Anonymous)), Decision::Redirect("sign-in".into()));
    assert_eq!(guard.decide(&sign_in, &session(SessionStatus::Authenticated)), Decision::Redirect("home".into()));
    // The default login name is just another public route here.
    assert_eq!(guard.decide(&login(), &session(SessionStatus::Authenticated)), Decision::Allow);
}

#[test]
fn decide_ignores_persisted_flag() {
    // A session that was never authenticated stays redirected no matter
    // what a previous run left in local storage.
    let decision = guard().decide(&dashboard(), &Session::default());
    assert_eq!(decision, Decision::Redirect("login".into()));
}

#[test]
fn decide_is_deterministic() {
    let snapshot = session(SessionStatus::Anonymous);
    let first = guard().decide(&dashboard(), &snapshot);
    let second = guard().decide(&dashboard(), &snapshot);
    assert_eq!(first, second);
}

// =============================================================================
// RouteTable
// =============================================================================

#[test]
fn default_table_declares_app_routes() {
    let table = RouteTable::default();
    assert!(!table.by_name("login").unwrap().requires_auth);
    for name in ["dashboard", "branches", "services"] {
        assert!(table.by_name(name).unwrap().requires_auth, "{name}");
    }
    assert_eq!(table.iter().count(), 4);
}

#[test]
fn root_path_resolves_to_login() {
    let table = RouteTable::default();
    assert_eq!(table.resolve("/").map(|r| r.name.as_str()), Some("login"));
}

#[test]
fn resolve_ignores_trailing_slash() {
    let table = RouteTable::default();
    assert_eq!(table.resolve("/branches/").map(|r| r.name.as_str()), Some("branches"));
}

#[test]
fn resolve_unknown_path_is_none() {
    assert!(RouteTable::default().resolve("/nope").is_none());
}

#[test]
fn with_route_replaces_same_name() {
    let table = RouteTable::default().with_route(Route::public("services", "/services"));
    assert!(!table.by_name("services").unwrap().requires_auth);
    assert_eq!(table.iter().count(), 4);
}
