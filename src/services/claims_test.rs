use serde_json::json;

use super::*;
use crate::ports::memory::MemoryIdentityProvider;

fn raw(value: serde_json::Value) -> RawClaims {
    value.as_object().cloned().unwrap_or_default()
}

// =============================================================================
// Claims typing
// =============================================================================

#[test]
fn from_raw_strips_reserved_token_fields() {
    let claims = Claims::from_raw(&raw(json!({
        "iss": "https://issuer",
        "aud": "app",
        "exp": 1_700_000_000,
        "user_id": "u1",
        "firebase": { "sign_in_provider": "password" },
        "admin": true,
    })));
    assert_eq!(claims.len(), 1);
    assert!(claims.is_admin());
}

#[test]
fn values_are_typed() {
    let claims = Claims::from_raw(&raw(json!({
        "admin": true,
        "level": 3,
        "region": "eu",
        "scopes": ["a", "b"],
    })));
    assert_eq!(claims.get("admin"), Some(&ClaimValue::Bool(true)));
    assert_eq!(claims.get("level"), Some(&ClaimValue::Number(3.0)));
    assert_eq!(claims.get("region"), Some(&ClaimValue::Text("eu".into())));
    assert_eq!(claims.get("scopes"), Some(&ClaimValue::Other(json!(["a", "b"]))));
}

#[test]
fn flag_requires_literal_true() {
    let claims = Claims::from_raw(&raw(json!({
        "admin": "true",
        "serviceProvider": 1,
    })));
    assert!(!claims.is_admin());
    assert!(!claims.is_service_provider());
    assert!(!claims.flag("missing"));
}

#[test]
fn projections_default_false_when_absent() {
    assert!(!is_admin(None));
    assert!(!is_service_provider(None));
    let claims = Claims::from_raw(&raw(json!({ "serviceProvider": true })));
    assert!(!is_admin(Some(&claims)));
    assert!(is_service_provider(Some(&claims)));
}

#[test]
fn iter_is_sorted_by_name() {
    let claims = Claims::from_raw(&raw(json!({ "b": true, "a": false })));
    let names: Vec<&str> = claims.iter().map(|(k, _)| k).collect();
    assert_eq!(names, vec!["a", "b"]);
}

#[test]
fn claims_serialize_as_plain_map() {
    let claims = Claims::from_raw(&raw(json!({ "admin": true })));
    assert_eq!(serde_json::to_value(&claims).unwrap(), json!({ "admin": true }));
}

// =============================================================================
// ClaimsResolver
// =============================================================================

#[tokio::test]
async fn resolver_respects_forced_refresh() {
    let provider = MemoryIdentityProvider::new();
    let identity = provider.add_account("a@b.com", "pw", raw(json!({ "admin": false })));
    provider.authenticate("a@b.com", "pw").await.unwrap();
    provider.set_claims(&identity.id, raw(json!({ "admin": true })));

    let resolver = ClaimsResolver::new(Arc::new(provider));
    assert!(!resolver.resolve(&identity, false).await.unwrap().is_admin());
    assert!(resolver.resolve(&identity, true).await.unwrap().is_admin());
}

#[tokio::test]
async fn resolver_propagates_provider_failure() {
    let provider = MemoryIdentityProvider::new();
    let identity = provider.add_account("a@b.com", "pw", RawClaims::new());
    provider.set_offline(true);
    let resolver = ClaimsResolver::new(Arc::new(provider));
    let err = resolver.resolve(&identity, true).await.unwrap_err();
    assert!(matches!(err, ClaimsError::Fetch(_)));
}
