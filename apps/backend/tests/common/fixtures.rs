//! Test fixtures and factory functions for creating test data.

use chrono::{Duration, Utc};

use flashcards_backend::models::{Card, Deck, Snapshot};
use flashcard_core::types::{CardContent, Difficulty, ProgressRecord};

/// A deck with the given name, created now.
pub fn deck(name: &str) -> Deck {
    Deck::new(name, "#3b82f6", "book", Utc::now())
}

/// A basic front/back card in `deck`.
pub fn basic_card(deck: &Deck, front: &str, back: &str) -> Card {
    Card::new(
        deck,
        CardContent::Basic {
            front: front.to_string(),
            back: back.to_string(),
        },
        Difficulty::Medium,
        Utc::now(),
    )
}

/// A snapshot with one deck, `num_cards` cards and progress for the first card.
pub fn sample_snapshot(num_cards: usize) -> Snapshot {
    let deck = deck("Rust");
    let cards: Vec<Card> = (0..num_cards)
        .map(|i| basic_card(&deck, &format!("Question {}?", i + 1), &format!("Answer {}.", i + 1)))
        .collect();

    let mut snapshot = Snapshot {
        decks: vec![deck],
        ..Default::default()
    };

    if let Some(first) = cards.first() {
        let reviewed = Utc::now() - Duration::hours(1);
        let record = ProgressRecord {
            correct: 1,
            review_count: 1,
            last_reviewed: Some(reviewed),
            last_updated: Some(reviewed),
            ..Default::default()
        };
        snapshot.progress.insert(first.id.clone(), record);
    }
    snapshot.cards = cards;
    snapshot
}
