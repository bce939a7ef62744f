//! Client-facing error taxonomy.
//!
//! Each variant carries an internal diagnostic (its `Display`, logged) and maps to a
//! client-safe message and HTTP status. Backend failures never leak detail to the
//! client.

use std::fmt;

use axum::http::{Method, StatusCode};
use thiserror::Error;

use crate::storage::StorageError;

/// Which size limit was exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    RecordId,
    Data,
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RecordId => f.write_str("record_id"),
            Self::Data => f.write_str("data"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("no valid auth token configured for this server")]
    ServerConfiguration,

    #[error("unsuccessful login attempt")]
    Unauthorized,

    #[error("requested path {0} did not match any route")]
    NoRoute(String),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("{kind} is {actual} bytes, limit is {limit}")]
    LimitExceeded {
        kind: LimitKind,
        limit: usize,
        actual: usize,
    },

    #[error("write access denied for record: \"{0}\"")]
    WriteAccessDenied(String),

    #[error("list attempted with a read-only token")]
    ListAccessDenied,

    #[error("no data payload received for record: \"{0}\"")]
    EmptyPayload(String),

    #[error("cannot update record: record \"{0}\" does not exist")]
    RecordNotFound(String),

    #[error("cannot create record: record \"{0}\" already exists")]
    RecordAlreadyExists(String),

    #[error("method {method} rejected: {reason}")]
    MethodNotSupported {
        method: Method,
        reason: &'static str,
        allow: Option<&'static str>,
    },

    #[error("storage backend failure: {0}")]
    Backend(#[from] StorageError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::ServerConfiguration => StatusCode::SERVICE_UNAVAILABLE,
            Self::Unauthorized | Self::ListAccessDenied => StatusCode::FORBIDDEN,
            Self::MethodNotSupported { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NoRoute(_)
            | Self::InvalidRequest(_)
            | Self::LimitExceeded { .. }
            | Self::WriteAccessDenied(_)
            | Self::EmptyPayload(_)
            | Self::RecordNotFound(_)
            | Self::RecordAlreadyExists(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Text placed in the response's `error_text`.
    pub fn client_message(&self) -> String {
        match self {
            Self::ServerConfiguration => "server configuration error".to_string(),
            Self::Unauthorized => "unauthorized: provide a valid token to continue".to_string(),
            Self::NoRoute(_) => "requested path did not match any".to_string(),
            Self::LimitExceeded {
                kind: LimitKind::RecordId,
                limit,
                ..
            } => format!("record_id is too long. {} bytes MAX", limit),
            Self::LimitExceeded {
                kind: LimitKind::Data,
                limit,
                ..
            } => format!("data size too big. {} bytes MAX", limit),
            Self::ListAccessDenied => "write access is required to list records".to_string(),
            Self::MethodNotSupported { reason, .. } => reason.to_string(),
            Self::Backend(_) => "unknown error".to_string(),
            Self::InvalidRequest(_)
            | Self::WriteAccessDenied(_)
            | Self::EmptyPayload(_)
            | Self::RecordNotFound(_)
            | Self::RecordAlreadyExists(_) => self.to_string(),
        }
    }

    /// `Allow` header to send along with the error, if any.
    pub fn allow(&self) -> Option<&'static str> {
        match self {
            Self::MethodNotSupported { allow, .. } => *allow,
            _ => None,
        }
    }

    /// Whether the failure is the server's fault rather than the caller's.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Backend(_) | Self::ServerConfiguration)
    }
}
