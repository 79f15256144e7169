//! Core flashcard library shared by the sync layer and the backend.
//!
//! Provides:
//! - Shared types (Deck, Card, ProgressRecord, Snapshot, etc.)
//! - SM-2 spaced repetition scheduling and quality mapping
//! - Due-card selection and learning statistics
//! - Last-write-wins reconciliation of local and remote snapshots
//! - Snapshot validation, repair and deck/card edits

pub mod algorithm;
pub mod collection;
pub mod error;
pub mod queue;
pub mod reconcile;
pub mod repair;
pub mod stats;
pub mod types;

pub use algorithm::{
    quality_from_answer, quality_from_rating_name, ProgressUpdate, ReviewOutcome, SchedulerState,
    Sm2,
};
pub use error::{Result, ValidationError};
pub use queue::{cards_for_review, due_cards};
pub use reconcile::{merge_snapshots, reconcile, MergeReport, MergeSource, Reconciled};
pub use repair::{validate, validate_and_repair, RepairReport};
pub use stats::{detailed_metrics, learning_stats, DetailedMetrics, LearningStats};
pub use types::{
    Card, CardContent, Collection, CollectionKind, Deck, Difficulty, ProgressMap, ProgressRecord,
    Rating, Snapshot, DEFAULT_DECK_ID,
};
