//! Common test utilities.

use std::net::SocketAddr;
use std::sync::Arc;

use redisflare::auth::AuthRegistry;
use redisflare::server;
use redisflare::storage::StorageInterface;

pub const MASTER: &str = "test-master-token";
pub const PUBLIC: &str = "test-public-token";

/// Serve `storage` on an ephemeral local port and return its base URL.
pub async fn spawn_server(storage: Arc<dyn StorageInterface>) -> String {
    let app = server::app(storage, AuthRegistry::new(Some(MASTER), Some(PUBLIC)));
    let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}
