//! Account document endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;

use crate::error::Result;
use crate::models::*;
use crate::AppState;

/// GET /api/accounts/:account/snapshot
pub async fn get_snapshot(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
) -> Result<Json<Snapshot>> {
    validate_account_id(&account_id)?;

    let snapshot = state.db.get_snapshot(&account_id).await?;
    tracing::debug!(
        account = %account_id,
        decks = snapshot.decks.len(),
        cards = snapshot.cards.len(),
        "snapshot served"
    );

    Ok(Json(snapshot))
}

/// PUT /api/accounts/:account/snapshot
pub async fn put_snapshot(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
    Json(snapshot): Json<Snapshot>,
) -> Result<Json<WriteResponse>> {
    validate_account_id(&account_id)?;

    state.db.put_snapshot(&account_id, &snapshot).await?;
    tracing::info!(account = %account_id, "snapshot replaced");

    Ok(Json(WriteResponse {
        account_id,
        kinds: CollectionKind::ALL.to_vec(),
    }))
}

/// PUT /api/accounts/:account/:kind
pub async fn put_collection(
    State(state): State<AppState>,
    Path((account_id, kind)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<Json<WriteResponse>> {
    validate_account_id(&account_id)?;
    let kind = parse_kind(&kind)?;
    let collection = parse_collection(kind, body)?;

    state.db.put_document(&account_id, &collection).await?;
    tracing::info!(account = %account_id, %kind, entries = collection.len(), "document replaced");

    Ok(Json(WriteResponse {
        account_id,
        kinds: vec![kind],
    }))
}

/// DELETE /api/accounts/:account
pub async fn delete_account(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
) -> Result<Json<DeleteResponse>> {
    validate_account_id(&account_id)?;

    let deleted = state.db.delete_account(&account_id).await?;
    tracing::info!(account = %account_id, deleted, "account documents deleted");

    Ok(Json(DeleteResponse { deleted }))
}
