//! Storage Port Module
//!
//! Defines the abstract contract the request dispatcher uses to reach the actual
//! key-value medium, plus the backends shipped with the server.
//!
//! ## Core Concepts
//! - **StorageInterface**: `read`, `write`, `delete` and `list` against a backing store.
//!   The dispatcher only ever talks to this trait; which backend sits behind it is
//!   decided by the hosting layer.
//! - **Limits**: every backend advertises its key and record size limits, which the
//!   dispatcher enforces before any call is made.
//! - **Conditional writes**: `create`/`update` default to a best-effort
//!   read-then-write. Backends able to do it atomically override them.
//! - **Listing**: keys are enumerated in pages; the cursor is opaque to callers and is
//!   replayed verbatim to continue.

pub mod disk;
pub mod error;
pub mod memory;


use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

pub use disk::LocalDiskStore;
pub use error::{StorageError, StorageResult};
pub use memory::MemoryStore;

/// Maximum record id size in bytes (Cloudflare KV limit).
pub const DEFAULT_MAX_KEY_SIZE: usize = 512;
/// Maximum record payload size in bytes, 25 MiB (Cloudflare KV limit).
pub const DEFAULT_MAX_RECORD_SIZE: usize = 26_214_400;
/// Page size used when a list request does not ask for one.
pub const DEFAULT_LIST_LIMIT: usize = 1000;

/// Size limits a backend can honour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageLimits {
    pub max_key_size: usize,
    pub max_record_size: usize,
}

impl Default for StorageLimits {
    fn default() -> Self {
        Self {
            max_key_size: DEFAULT_MAX_KEY_SIZE,
            max_record_size: DEFAULT_MAX_RECORD_SIZE,
        }
    }
}

/// Options accepted by [`StorageInterface::list`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreListOptions {
    pub prefix: Option<String>,
    pub cursor: Option<String>,
    pub limit: Option<usize>,
}

/// A single key returned by a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreListingKey {
    pub name: String,
    /// Backend-supplied expiration (seconds since epoch), surfaced read-only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl StoreListingKey {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expiration: None,
            metadata: None,
        }
    }
}

/// One page of keys.
///
/// `cursor` is only meaningful while `list_complete` is `false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreListing {
    pub keys: Vec<StoreListingKey>,
    pub cursor: Option<String>,
    pub list_complete: bool,
}

/// Abstract key-value medium consumed by the dispatcher.
///
/// Implementations apply their own timeout/retry policy and surface failures as
/// [`StorageError`] instead of hanging the caller.
#[async_trait]
pub trait StorageInterface: Send + Sync {
    /// Fetch a record. Absence is `Ok(None)`, not an error.
    async fn read(&self, record_id: &str) -> StorageResult<Option<String>>;

    /// Unconditional upsert.
    async fn write(&self, record_id: &str, data: &str) -> StorageResult<()>;

    /// Remove a record. Deleting a missing record succeeds.
    async fn delete(&self, record_id: &str) -> StorageResult<()>;

    /// Enumerate keys, optionally filtered by prefix and resumed from a cursor.
    async fn list(&self, options: StoreListOptions) -> StorageResult<StoreListing>;

    /// Size limits of this backend.
    fn limits(&self) -> StorageLimits {
        StorageLimits::default()
    }

    /// Write only if the record does not exist yet. Returns `false` when it does.
    ///
    /// The default implementation is a non-atomic read-then-write.
    async fn create(&self, record_id: &str, data: &str) -> StorageResult<bool> {
        if self.read(record_id).await?.is_some() {
            return Ok(false);
        }
        self.write(record_id, data).await?;
        Ok(true)
    }

    /// Write only if the record already exists. Returns `false` when it does not.
    ///
    /// The default implementation is a non-atomic read-then-write.
    async fn update(&self, record_id: &str, data: &str) -> StorageResult<bool> {
        if self.read(record_id).await?.is_none() {
            return Ok(false);
        }
        self.write(record_id, data).await?;
        Ok(true)
    }
}

/// Encode the last key of a page into an opaque cursor.
pub(crate) fn encode_cursor(last_key: &str) -> String {
    URL_SAFE_NO_PAD.encode(last_key.as_bytes())
}

/// Decode a cursor produced by [`encode_cursor`].
pub(crate) fn decode_cursor(cursor: &str) -> StorageResult<String> {
    let bytes = URL_SAFE_NO_PAD
        .decode(cursor)
        .map_err(|_| StorageError::InvalidCursor(cursor.to_string()))?;
    String::from_utf8(bytes).map_err(|_| StorageError::InvalidCursor(cursor.to_string()))
}

/// Shared pagination over an already sorted key set.
///
/// Keys strictly after the cursor's key and starting with `prefix` are taken, up to
/// `limit`. A cursor is emitted only when more matching keys remain.
pub(crate) fn paginate(
    sorted_keys: Vec<String>,
    options: &StoreListOptions,
) -> StorageResult<StoreListing> {
    let after = options.cursor.as_deref().map(decode_cursor).transpose()?;
    let limit = options.limit.unwrap_or(DEFAULT_LIST_LIMIT).max(1);

    let mut matching = sorted_keys.into_iter().filter(|key| {
        let after_cursor = after.as_ref().is_none_or(|last| key.as_str() > last.as_str());
        let has_prefix = options
            .prefix
            .as_deref()
            .is_none_or(|prefix| key.starts_with(prefix));
        after_cursor && has_prefix
    });

    let page: Vec<String> = matching.by_ref().take(limit).collect();
    let list_complete = matching.next().is_none();
    let cursor = match (list_complete, page.last()) {
        (false, Some(last)) => Some(encode_cursor(last)),
        _ => None,
    };

    Ok(StoreListing {
        keys: page.into_iter().map(StoreListingKey::named).collect(),
        cursor,
        list_complete,
    })
}
