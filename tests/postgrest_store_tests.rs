/// Tests for the Supabase-backed credential store against a mock PostgREST server
use keygate::{
    db::Database,
    models::Scope,
    store::{ApiKeyStore, PostgrestStore, StoreError, UserStore},
    utils::config::DatabaseConfig,
};
use mockito::{Matcher, ServerGuard};
use serde_json::json;
use std::collections::BTreeSet;
use uuid::Uuid;

async fn setup() -> (ServerGuard, PostgrestStore) {
    let server = mockito::Server::new_async().await;
    let db = Database::new(&DatabaseConfig {
        supabase_url: server.url(),
        supabase_key: "service-role-key".to_string(),
    });
    (server, PostgrestStore::new(db))
}

fn api_key_row(key: &str) -> serde_json::Value {
    json!({
        "key": key,
        "version": 1,
        "scopes": ["GENERAL"],
        "active": true,
        "created_at": "2024-01-01T00:00:00Z",
        "updated_at": "2024-01-01T00:00:00Z"
    })
}

#[tokio::test]
async fn test_find_active_key() {
    let (mut server, store) = setup().await;
    let mock = server
        .mock("GET", "/rest/v1/api_keys")
        .match_header("apikey", "service-role-key")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded(
                "select".to_string(),
                "key,version,scopes,active,created_at,updated_at".to_string(),
            ),
            Matcher::UrlEncoded("key".to_string(), "eq.live-key".to_string()),
            Matcher::UrlEncoded("active".to_string(), "eq.true".to_string()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!([api_key_row("live-key")]).to_string())
        .create_async()
        .await;

    let record = store.find_active("live-key").await.unwrap().unwrap();

    mock.assert_async().await;
    assert_eq!(record.key, "live-key");
    assert_eq!(record.version, 1);
    assert!(record.has_scope(Scope::General));
}

#[tokio::test]
async fn test_find_active_key_absent() {
    let (mut server, store) = setup().await;
    server
        .mock("GET", "/rest/v1/api_keys")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;

    assert!(store.find_active("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn test_unreachable_store_is_unavailable() {
    let (mut server, store) = setup().await;
    server
        .mock("GET", "/rest/v1/api_keys")
        .match_query(Matcher::Any)
        .with_status(503)
        .with_body("upstream down")
        .create_async()
        .await;

    let result = store.find_active("live-key").await;
    assert!(matches!(result, Err(StoreError::Unavailable(_))));
}

#[tokio::test]
async fn test_malformed_rows_are_decode_errors() {
    let (mut server, store) = setup().await;
    server
        .mock("GET", "/rest/v1/api_keys")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"[{"key": "live-key", "scopes": "not-a-list"}]"#)
        .create_async()
        .await;

    let result = store.find_active("live-key").await;
    assert!(matches!(result, Err(StoreError::Decode(_))));
}

#[tokio::test]
async fn test_deactivate_missing_key_is_not_found() {
    let (mut server, store) = setup().await;
    server
        .mock("PATCH", "/rest/v1/api_keys")
        .match_query(Matcher::UrlEncoded(
            "key".to_string(),
            "eq.ghost".to_string(),
        ))
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;

    let result = store.set_active("ghost", false).await;
    assert!(matches!(result, Err(StoreError::NotFound)));
}

#[tokio::test]
async fn test_set_scopes_sends_patch() {
    let (mut server, store) = setup().await;
    let mock = server
        .mock("PATCH", "/rest/v1/api_keys")
        .match_query(Matcher::UrlEncoded(
            "key".to_string(),
            "eq.live-key".to_string(),
        ))
        .match_body(Matcher::PartialJson(json!({ "scopes": ["GENERAL"] })))
        .with_status(200)
        .with_body(json!([api_key_row("live-key")]).to_string())
        .create_async()
        .await;

    store
        .set_scopes("live-key", BTreeSet::from([Scope::General]))
        .await
        .unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_duplicate_user_insert() {
    let (mut server, store) = setup().await;
    server
        .mock("POST", "/rest/v1/users")
        .with_status(409)
        .with_body(r#"{"code":"23505","message":"duplicate key value"}"#)
        .create_async()
        .await;

    let user = keygate::models::UserRecord {
        id: Uuid::new_v4(),
        name: "Ada".to_string(),
        email: "ada@example.com".to_string(),
        password_hash: "hash".to_string(),
    };

    let result = store.insert_user(user).await;
    assert!(matches!(result, Err(StoreError::Duplicate)));
}

#[tokio::test]
async fn test_find_profile_selects_public_columns() {
    let (mut server, store) = setup().await;
    let id = Uuid::new_v4();
    let mock = server
        .mock("GET", "/rest/v1/users")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("select".to_string(), "id,name,email".to_string()),
            Matcher::UrlEncoded("id".to_string(), format!("eq.{id}")),
        ]))
        .with_status(200)
        .with_body(json!([{ "id": id, "name": "Ada", "email": "ada@example.com" }]).to_string())
        .create_async()
        .await;

    let profile = store.find_profile(id).await.unwrap().unwrap();

    mock.assert_async().await;
    assert_eq!(profile.id, id);
    assert_eq!(profile.email, "ada@example.com");
}

#[tokio::test]
async fn test_find_by_email_lowercases() {
    let (mut server, store) = setup().await;
    let mock = server
        .mock("GET", "/rest/v1/users")
        .match_query(Matcher::UrlEncoded(
            "email".to_string(),
            "eq.ada@example.com".to_string(),
        ))
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;

    assert!(store
        .find_by_email("Ada@Example.com")
        .await
        .unwrap()
        .is_none());
    mock.assert_async().await;
}
