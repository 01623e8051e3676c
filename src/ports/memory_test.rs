use std::sync::Mutex;

use serde_json::json;

use super::*;
use crate::error::ErrorCode;

fn claims(value: serde_json::Value) -> RawClaims {
    value.as_object().cloned().unwrap_or_default()
}

fn recorder() -> (ChangeHandler, Arc<Mutex<Vec<Option<String>>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let handler: ChangeHandler = Arc::new(move |identity: Option<Identity>| {
        sink.lock().unwrap().push(identity.map(|i| i.id));
    });
    (handler, seen)
}

// =============================================================================
// MemoryIdentityProvider
// =============================================================================

#[tokio::test]
async fn authenticate_with_valid_credentials() {
    let provider = MemoryIdentityProvider::new();
    let identity = provider.add_account("a@b.com", "secret", claims(json!({ "admin": true })));
    let sign_in = provider.authenticate("A@B.com", "secret").await.unwrap();
    assert_eq!(sign_in.identity, identity);
    assert_eq!(sign_in.raw_claims.unwrap().get("admin"), Some(&json!(true)));
    assert_eq!(provider.current(), Some(identity));
}

#[tokio::test]
async fn authenticate_rejects_wrong_password() {
    let provider = MemoryIdentityProvider::new();
    provider.add_account("a@b.com", "secret", RawClaims::new());
    let err = provider.authenticate("a@b.com", "wrong").await.unwrap_err();
    assert!(err.is_credential_error());
    assert!(provider.current().is_none());
}

#[tokio::test]
async fn authenticate_offline_is_unavailable() {
    let provider = MemoryIdentityProvider::new();
    provider.add_account("a@b.com", "secret", RawClaims::new());
    provider.set_offline(true);
    let err = provider.authenticate("a@b.com", "secret").await.unwrap_err();
    assert!(err.retryable());
}

#[tokio::test]
async fn subscribe_delivers_current_state_first() {
    let provider = MemoryIdentityProvider::new();
    let (handler, seen) = recorder();
    let _sub = provider.subscribe(handler);
    assert_eq!(*seen.lock().unwrap(), vec![None]);
    assert_eq!(provider.handler_count(), 1);
}

#[tokio::test]
async fn sign_in_and_out_notify_handlers() {
    let provider = MemoryIdentityProvider::new();
    let identity = provider.add_account("a@b.com", "secret", RawClaims::new());
    let (handler, seen) = recorder();
    let _sub = provider.subscribe(handler);

    provider.authenticate("a@b.com", "secret").await.unwrap();
    provider.sign_out().await.unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![None, Some(identity.id), None]);
}

#[tokio::test]
async fn failed_sign_out_keeps_session_and_stays_silent() {
    let provider = MemoryIdentityProvider::new();
    let identity = provider.add_account("a@b.com", "secret", RawClaims::new());
    provider.authenticate("a@b.com", "secret").await.unwrap();
    let (handler, seen) = recorder();
    let _sub = provider.subscribe(handler);

    provider.set_sign_out_failure(true);
    assert!(provider.sign_out().await.is_err());
    assert_eq!(provider.current(), Some(identity.clone()));
    assert_eq!(*seen.lock().unwrap(), vec![Some(identity.id)]);
}

#[tokio::test]
async fn unsubscribe_removes_handler() {
    let provider = MemoryIdentityProvider::new();
    let (handler, seen) = recorder();
    let sub = provider.subscribe(handler);
    sub.unsubscribe();
    assert_eq!(provider.handler_count(), 0);

    provider.emit(Some(Identity::new("u1")));
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn unforced_claims_are_served_from_token_cache() {
    let provider = MemoryIdentityProvider::new();
    let identity = provider.add_account("a@b.com", "secret", claims(json!({ "admin": false })));
    provider.authenticate("a@b.com", "secret").await.unwrap();

    provider.set_claims(&identity.id, claims(json!({ "admin": true })));

    let cached = provider.get_claims(&identity, false).await.unwrap();
    assert_eq!(cached.get("admin"), Some(&json!(false)));

    let fresh = provider.get_claims(&identity, true).await.unwrap();
    assert_eq!(fresh.get("admin"), Some(&json!(true)));

    let cached_again = provider.get_claims(&identity, false).await.unwrap();
    assert_eq!(cached_again.get("admin"), Some(&json!(true)));
}

#[tokio::test]
async fn claims_for_unknown_identity_have_no_token() {
    let provider = MemoryIdentityProvider::new();
    let err = provider
        .get_claims(&Identity::new("ghost"), true)
        .await
        .unwrap_err();
    assert_eq!(err, ClaimsError::NoToken("ghost".into()));
}

// =============================================================================
// MemoryDocumentStore
// =============================================================================

#[tokio::test]
async fn document_get_missing_is_none() {
    let store = MemoryDocumentStore::new();
    assert!(store.get("users", "u1").await.unwrap().is_none());
}

#[tokio::test]
async fn document_merge_creates_and_patches() {
    let store = MemoryDocumentStore::new();
    store
        .merge("users", "u1", &claims(json!({ "name": "Ada", "city": "London" })))
        .await
        .unwrap();
    store
        .merge("users", "u1", &claims(json!({ "city": "Paris" })))
        .await
        .unwrap();
    let doc = store.get("users", "u1").await.unwrap().unwrap();
    assert_eq!(doc.get("name"), Some(&json!("Ada")));
    assert_eq!(doc.get("city"), Some(&json!("Paris")));
}

#[tokio::test]
async fn document_store_unavailable_fails_calls() {
    let store = MemoryDocumentStore::new();
    store.insert("users", "u1", RawClaims::new());
    store.set_unavailable(true);
    assert!(store.get("users", "u1").await.is_err());
    assert!(store.merge("users", "u1", &RawClaims::new()).await.is_err());
    assert!(store.document("users", "u1").is_some());
}
