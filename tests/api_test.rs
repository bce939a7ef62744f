//! End-to-end tests over a real socket, driven by the HTTP client.

use std::sync::Arc;

use redisflare::auth::Rights;
use redisflare::client::{ClientError, RedisflareClient};
use redisflare::config::{Backend, ServerConfig};
use redisflare::server;
use redisflare::storage::MemoryStore;
use tempfile::TempDir;

mod common;

use common::{MASTER, PUBLIC, spawn_server};

// ============================================================================
// Auth
// ============================================================================

#[tokio::test]
async fn test_auth_reports_rights_per_token() {
    let host = spawn_server(Arc::new(MemoryStore::new())).await;

    let mut master = RedisflareClient::new(&host, MASTER).unwrap();
    assert_eq!(master.auth().await.unwrap(), Rights::ReadWrite);
    assert_eq!(master.rights(), Some(Rights::ReadWrite));

    let mut public = RedisflareClient::new(&host, PUBLIC).unwrap();
    assert_eq!(public.auth().await.unwrap(), Rights::ReadOnly);
}

#[tokio::test]
async fn test_wrong_token_is_rejected() {
    let host = spawn_server(Arc::new(MemoryStore::new())).await;
    let mut client = RedisflareClient::new(&host, "not-a-token").unwrap();

    match client.auth().await {
        Err(ClientError::Api { status, message }) => {
            assert_eq!(status, 403);
            assert_eq!(message, "unauthorized: provide a valid token to continue");
        }
        other => panic!("expected 403, got {:?}", other),
    }
    assert!(client.rights().is_none());
}

#[tokio::test]
async fn test_health_without_valid_token() {
    let host = spawn_server(Arc::new(MemoryStore::new())).await;
    let client = RedisflareClient::new(&host, "whatever").unwrap();

    assert!(client.health().await.unwrap() > 0);
}

// ============================================================================
// CRUD
// ============================================================================

#[tokio::test]
async fn test_crud_lifecycle() {
    let host = spawn_server(Arc::new(MemoryStore::new())).await;
    let client = RedisflareClient::new(&host, MASTER).unwrap();

    assert_eq!(client.get("k").await.unwrap(), None);

    client.create("k", "v1").await.unwrap();
    assert_eq!(client.get("k").await.unwrap(), Some("v1".to_string()));

    let conflict = client.create("k", "v2").await;
    assert!(matches!(conflict, Err(ClientError::Api { status: 400, .. })));
    assert_eq!(client.get("k").await.unwrap(), Some("v1".to_string()));

    client.update("k", "v3").await.unwrap();
    client.set("k", "v4").await.unwrap();
    assert_eq!(client.get("k").await.unwrap(), Some("v4".to_string()));

    client.delete("k").await.unwrap();
    client.delete("k").await.unwrap();
    assert_eq!(client.get("k").await.unwrap(), None);

    let missing = client.update("k", "v5").await;
    assert!(matches!(missing, Err(ClientError::Api { status: 400, .. })));
    assert_eq!(client.get("k").await.unwrap(), None);
}

#[tokio::test]
async fn test_record_ids_with_reserved_characters() {
    let host = spawn_server(Arc::new(MemoryStore::new())).await;
    let client = RedisflareClient::new(&host, MASTER).unwrap();

    let record_id = "users/42?&name=a b#frag";
    client.set(record_id, "payload & more").await.unwrap();

    assert_eq!(
        client.get(record_id).await.unwrap(),
        Some("payload & more".to_string())
    );
}

#[tokio::test]
async fn test_read_only_client() {
    let host = spawn_server(Arc::new(MemoryStore::new())).await;
    let master = RedisflareClient::new(&host, MASTER).unwrap();
    let public = RedisflareClient::new(&host, PUBLIC).unwrap();

    master.set("shared", "value").await.unwrap();

    assert_eq!(public.get("shared").await.unwrap(), Some("value".to_string()));
    assert!(matches!(
        public.set("shared", "hijack").await,
        Err(ClientError::Api { status: 400, .. })
    ));
    assert!(matches!(
        public.list(None, None).await,
        Err(ClientError::Api { status: 403, .. })
    ));
}

// ============================================================================
// List
// ============================================================================

#[tokio::test]
async fn test_list_walks_all_pages() {
    let store = Arc::new(MemoryStore::new());
    let host = spawn_server(store.clone()).await;
    let client = RedisflareClient::new(&host, MASTER).unwrap();

    for i in 0..1200 {
        client.set(&format!("item-{:04}", i), "x").await.unwrap();
    }
    client.set("other", "x").await.unwrap();

    let mut names = Vec::new();
    let mut page: Option<String> = None;
    loop {
        let listing = client.list(Some("item-"), page.as_deref()).await.unwrap();
        names.extend(listing.entries.into_iter().map(|entry| entry.record_id));
        if listing.list_complete {
            break;
        }
        page = listing.next_page;
    }

    assert_eq!(names.len(), 1200);
    assert!(names.iter().all(|name| name.starts_with("item-")));
}

// ============================================================================
// Disk backend
// ============================================================================

#[tokio::test]
async fn test_disk_backend_from_config() {
    let temp_dir = TempDir::new().unwrap();
    let config = ServerConfig {
        backend: Backend::Disk,
        data_dir: temp_dir.path().join("records"),
        ..ServerConfig::default()
    };

    let storage = server::open_storage(&config).await.unwrap();
    let host = spawn_server(storage).await;
    let client = RedisflareClient::new(&host, MASTER).unwrap();

    client.create("doc", "on disk").await.unwrap();

    assert_eq!(client.get("doc").await.unwrap(), Some("on disk".to_string()));
    assert_eq!(
        std::fs::read_dir(temp_dir.path().join("records"))
            .unwrap()
            .count(),
        1
    );
}
