//! Error types for flashcard-core.

use thiserror::Error;

/// Result type alias using ValidationError.
pub type Result<T> = std::result::Result<T, ValidationError>;

/// Integrity violations in decks, cards and their references.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("cannot delete the last remaining deck")]
    LastDeck,

    #[error("deck not found: {0}")]
    DeckNotFound(String),

    #[error("card not found: {0}")]
    CardNotFound(String),

    #[error("card {card_id} references unknown deck '{deck_id}'")]
    UnknownDeck { card_id: String, deck_id: String },

    #[error("name must not be empty")]
    EmptyName,

    #[error("duplicate id {0}")]
    DuplicateId(String),
}
