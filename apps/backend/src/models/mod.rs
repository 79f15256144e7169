//! Database models and API types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::FromRow;

use crate::error::{ApiError, Result};

// Re-export shared types from flashcard-core
pub use flashcard_core::types::{Card, Collection, CollectionKind, Deck, ProgressMap, Snapshot};

/// Longest accepted account identifier.
pub const MAX_ACCOUNT_ID_LEN: usize = 128;

// === Database Entity Types ===

/// One collection document stored in PostgreSQL
#[derive(Debug, Clone, FromRow)]
pub struct DbDocument {
    pub account_id: String,
    pub kind: String,
    pub body: Json<Value>,
    pub updated_at: DateTime<Utc>,
}

// === API Types ===

/// Response for document writes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteResponse {
    pub account_id: String,
    pub kinds: Vec<CollectionKind>,
}

/// Response for account deletion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub deleted: u64,
}

// === Validation ===

/// Account ids are path segments: ASCII letters, digits, `-`, `_` and `.`.
pub fn validate_account_id(account_id: &str) -> Result<()> {
    if account_id.is_empty() || account_id.len() > MAX_ACCOUNT_ID_LEN {
        return Err(ApiError::BadRequest(format!(
            "account id must be 1-{} characters",
            MAX_ACCOUNT_ID_LEN
        )));
    }
    if !account_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(ApiError::BadRequest(format!(
            "invalid account id '{}'",
            account_id
        )));
    }
    Ok(())
}

pub fn parse_kind(kind: &str) -> Result<CollectionKind> {
    CollectionKind::from_name(kind)
        .ok_or_else(|| ApiError::BadRequest(format!("unknown collection kind '{}'", kind)))
}

/// Check a document body against the shape of its kind.
pub fn parse_collection(kind: CollectionKind, body: Value) -> Result<Collection> {
    let parsed = match kind {
        CollectionKind::Decks => serde_json::from_value(body).map(Collection::Decks),
        CollectionKind::Cards => serde_json::from_value(body).map(Collection::Cards),
        CollectionKind::Progress => serde_json::from_value(body).map(Collection::Progress),
    };
    parsed.map_err(|e| ApiError::Parse(format!("invalid {} document: {}", kind, e)))
}

/// Assemble a snapshot from stored documents. Missing kinds stay empty.
pub fn snapshot_from_documents(documents: Vec<DbDocument>) -> Result<Snapshot> {
    let mut snapshot = Snapshot::default();
    for document in documents {
        let kind = CollectionKind::from_name(&document.kind).ok_or_else(|| {
            ApiError::Internal(format!("stored document has unknown kind '{}'", document.kind))
        })?;
        let collection = parse_collection(kind, document.body.0).map_err(|e| {
            ApiError::Internal(format!(
                "stored {} document for {} is unreadable: {}",
                kind, document.account_id, e
            ))
        })?;
        snapshot.set_collection(collection);
    }
    Ok(snapshot)
}
