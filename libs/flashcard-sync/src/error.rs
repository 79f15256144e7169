//! Error types for local storage and synchronization.

use flashcard_core::ValidationError;
use thiserror::Error;

/// Local persistence failures. Always reported to the caller, never retried.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("local store unavailable: {0}")]
    Unavailable(String),
}

/// Orchestration failures.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("No connection to the remote store")]
    Offline,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Backend error: {status} - {message}")]
    Backend { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl SyncError {
    /// True for failures that mean the remote could not be reached or used.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            Self::Offline | Self::Network(_) | Self::Backend { .. } | Self::Parse(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
