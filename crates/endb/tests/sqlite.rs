//! Integration tests for the store over `SQLite`.
#![cfg(feature = "sqlite")]

use endb::{Endb, SqliteAdapter};
use serde_json::json;
use tempfile::TempDir;

#[tokio::test]
async fn test_connect_by_uri() {
    let temp = TempDir::new().unwrap();
    let uri = format!("sqlite://{}", temp.path().join("store.db").display());

    let store = Endb::connect(&uri).unwrap();
    assert_eq!(store.adapter_name(), "sqlite");
    assert!(store.forwards_errors());

    store.set("a", &json!({"x": 1})).await.unwrap();
    store.set_at("a", &2, "x").await.unwrap();
    assert_eq!(store.get("a").await.unwrap(), Some(json!({"x": 2})));
}

#[tokio::test]
async fn test_data_survives_reopen() {
    let temp = TempDir::new().unwrap();
    let uri = format!("sqlite://{}", temp.path().join("store.db").display());

    {
        let store = Endb::builder()
            .uri(&uri)
            .namespace("users")
            .table("people")
            .build()
            .unwrap();
        store.set("ada", &json!({"born": 1815})).await.unwrap();
    }

    let store = Endb::builder()
        .uri(&uri)
        .namespace("users")
        .table("people")
        .build()
        .unwrap();
    assert_eq!(store.get_at("ada", "born").await.unwrap(), Some(json!(1815)));
    assert_eq!(store.keys().await.unwrap(), vec!["ada".to_string()]);
}

#[tokio::test]
async fn test_adapter_name_with_in_memory_default() {
    let store = Endb::builder().adapter("sqlite").build().unwrap();
    store.set("k", &true).await.unwrap();
    assert!(store.has("k").await.unwrap());
    assert!(store.delete("k").await.unwrap());
    assert!(!store.delete("k").await.unwrap());
}

#[tokio::test]
async fn test_namespaces_share_one_table() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("shared.db");

    let users = Endb::builder()
        .namespace("users")
        .store(SqliteAdapter::open(&path).unwrap())
        .build()
        .unwrap();
    let posts = Endb::builder()
        .namespace("posts")
        .store(SqliteAdapter::open(&path).unwrap())
        .build()
        .unwrap();

    users.set("1", &"ada").await.unwrap();
    posts.set("1", &"hello").await.unwrap();

    posts.clear().await.unwrap();
    assert!(posts.all().await.unwrap().is_empty());
    assert_eq!(users.get("1").await.unwrap(), Some(json!("ada")));
    assert_eq!(users.entries().await.unwrap(), vec![("1".into(), json!("ada"))]);
}

#[tokio::test]
async fn test_invalid_table_is_rejected() {
    let err = Endb::builder()
        .uri("sqlite://:memory:")
        .table("kv; DROP TABLE x")
        .build()
        .unwrap_err();
    assert!(matches!(err, endb::EndbError::Configuration(_)));
}
