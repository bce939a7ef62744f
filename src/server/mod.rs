//! REST Server Module
//!
//! The request-handling core: parses a request, authenticates it, validates inputs,
//! calls the storage port and renders the uniform response envelope.
//!
//! ## Submodules
//! - **`protocol`**: Endpoints, query parameter names and the response envelope.
//! - **`error`**: The client-facing error taxonomy and its HTTP status mapping.
//! - **`request`**: Transport-independent request view and JSON body handling.
//! - **`dispatcher`**: Routing, authorization and CRUD semantics.
//! - **`handlers`**: Axum glue and router construction.

pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod protocol;
pub mod request;


use std::sync::Arc;

use anyhow::Context;
use axum::Router;

use crate::auth::AuthRegistry;
use crate::config::{Backend, ServerConfig};
use crate::storage::{LocalDiskStore, MemoryStore, StorageInterface};

pub use dispatcher::{Dispatcher, Reply};
pub use error::ApiError;
pub use handlers::build_app;

/// Instantiate the storage backend selected by the configuration.
pub async fn open_storage(config: &ServerConfig) -> anyhow::Result<Arc<dyn StorageInterface>> {
    let storage: Arc<dyn StorageInterface> = match config.backend {
        Backend::Memory => Arc::new(MemoryStore::new()),
        Backend::Disk => Arc::new(
            LocalDiskStore::open(&config.data_dir)
                .await
                .with_context(|| format!("opening data dir {}", config.data_dir.display()))?,
        ),
    };
    Ok(storage)
}

/// Wire a storage port and the configured tokens into a ready-to-serve router.
pub fn app(storage: Arc<dyn StorageInterface>, auth: AuthRegistry) -> Router {
    build_app(Arc::new(Dispatcher::new(storage, auth)))
}
