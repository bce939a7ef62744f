//! REST Wire Protocol
//!
//! Defines the public endpoints and the response envelope returned by every route.
//!
//! Every JSON response is exactly one of two shapes:
//! - success: `{ "success": true, "context": "<read|create|update|delete|list|ping|health>", ... }`
//! - failure: `{ "success": false, "error_text": "<client-safe message>" }`

use serde::{Deserialize, Serialize};

use crate::auth::Rights;
use crate::storage::StoreListingKey;

// --- API Endpoints ---

/// Liveness probe, no token required.
pub const ENDPOINT_HEALTH: &str = "/health";
/// Token check, reports the granted privilege.
pub const ENDPOINT_AUTH: &str = "/auth";
/// Alias of [`ENDPOINT_AUTH`].
pub const ENDPOINT_PING: &str = "/ping";
/// Single record CRUD.
pub const ENDPOINT_ROOT: &str = "/";
/// Alias of [`ENDPOINT_ROOT`].
pub const ENDPOINT_CRUD: &str = "/crud";
/// Record enumeration, write privilege required.
pub const ENDPOINT_LIST: &str = "/list";

/// `Allow` header value for the CRUD endpoints.
pub const CRUD_ALLOW: &str = "OPTIONS, GET, POST, PUT, PATCH, DELETE";
/// `Allow` header value for the list endpoint.
pub const LIST_ALLOW: &str = "GET";

// --- Query Parameters ---

pub const PARAM_REPORT: &str = "report";
pub const PARAM_TOKEN: &str = "token";
pub const PARAM_RECORD_ID: &str = "record_id";
pub const PARAM_DATA: &str = "data";
pub const PARAM_PREFIX: &str = "prefix";
pub const PARAM_PAGE: &str = "page";

// --- Data Transfer Objects ---

/// One record in a list response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListedRecord {
    pub record_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl From<StoreListingKey> for ListedRecord {
    fn from(key: StoreListingKey) -> Self {
        Self {
            record_id: key.name,
            expiration: key.expiration,
            metadata: key.metadata,
        }
    }
}

/// Payload of a successful response, tagged by `context`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "context", rename_all = "lowercase")]
pub enum SuccessPayload {
    /// Stored value, `null` when the record does not exist.
    Read { data: Option<String> },
    Create,
    Update,
    Delete,
    List {
        entries: Vec<ListedRecord>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        next_page: Option<String>,
        list_complete: bool,
    },
    Ping { rights: Rights },
    /// Milliseconds since the Unix epoch.
    Health { date: u64 },
}

/// The uniform response envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Envelope {
    Success {
        success: bool,
        #[serde(flatten)]
        payload: SuccessPayload,
    },
    Failure {
        success: bool,
        error_text: String,
    },
}

impl Envelope {
    pub fn success(payload: SuccessPayload) -> Self {
        Self::Success {
            success: true,
            payload,
        }
    }

    pub fn failure(error_text: impl Into<String>) -> Self {
        Self::Failure {
            success: false,
            error_text: error_text.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Current time in milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
