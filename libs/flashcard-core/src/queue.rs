//! Due-card selection.

use crate::types::{Card, ProgressMap, ProgressRecord};
use chrono::{DateTime, Utc};

/// True when the card has never been reviewed or its review time has come.
pub fn is_due(record: Option<&ProgressRecord>, now: DateTime<Utc>) -> bool {
    match record {
        None => true,
        Some(record) => record.next_review.map_or(true, |next| next <= now),
    }
}

/// Cards due for review. Output keeps input order; callers may re-sort.
pub fn cards_for_review(cards: &[Card], progress: &ProgressMap, now: DateTime<Utc>) -> Vec<Card> {
    cards
        .iter()
        .filter(|card| is_due(progress.get(&card.id), now))
        .cloned()
        .collect()
}

/// Due cards, optionally limited to one deck.
pub fn due_cards(
    cards: &[Card],
    progress: &ProgressMap,
    deck_id: Option<&str>,
    now: DateTime<Utc>,
) -> Vec<Card> {
    cards
        .iter()
        .filter(|card| deck_id.map_or(true, |id| card.deck_id == id))
        .filter(|card| is_due(progress.get(&card.id), now))
        .cloned()
        .collect()
}
