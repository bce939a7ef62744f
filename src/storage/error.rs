//! Error types for storage backends.

use std::path::PathBuf;
use thiserror::Error;

/// Errors a storage backend can surface to the dispatcher.
#[derive(Debug, Error)]
pub enum StorageError {
    /// I/O error while touching the backing medium.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A record could not be encoded for storage.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A stored record could not be decoded.
    #[error("corrupted record at {path}: {message}")]
    Corrupted { path: PathBuf, message: String },

    /// A list cursor that this backend never produced.
    #[error("invalid list cursor: {0}")]
    InvalidCursor(String),
}

impl StorageError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization(message.into())
    }

    pub fn corrupted(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Corrupted {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;
