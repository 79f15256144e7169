//! Integrity checks and repair for merged snapshots.
//!
//! Merging never touches cross-entity references, so a card can arrive from
//! one side while its deck was deleted on the other. [`validate_and_repair`]
//! is the one place those references get fixed.

use crate::error::{Result, ValidationError};
use crate::types::{
    Deck, ProgressRecord, Snapshot, DEFAULT_DECK_ID, INITIAL_EASE_FACTOR, MINIMUM_EASE_FACTOR,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// What [`validate_and_repair`] changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    /// The default deck had to be created.
    pub created_default_deck: bool,
    /// Cards moved to the default deck because their deck did not exist.
    pub reassigned_cards: Vec<String>,
    /// Cards whose cached deck name was stale.
    pub refreshed_deck_names: usize,
    /// Cards with out-of-range scheduler fields.
    pub normalized_cards: usize,
    /// Progress records with out-of-range fields or inconsistent counts.
    pub normalized_progress: usize,
    /// Progress records for cards that no longer exist. Reported, not removed.
    pub dangling_progress: Vec<String>,
}

impl RepairReport {
    /// True when nothing was changed.
    pub fn is_clean(&self) -> bool {
        !self.created_default_deck
            && self.reassigned_cards.is_empty()
            && self.refreshed_deck_names == 0
            && self.normalized_cards == 0
            && self.normalized_progress == 0
    }
}

/// Check a snapshot and return the first integrity violation found.
pub fn validate(snapshot: &Snapshot) -> Result<()> {
    let mut deck_ids = HashSet::new();
    for deck in &snapshot.decks {
        if deck.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if !deck_ids.insert(deck.id.as_str()) {
            return Err(ValidationError::DuplicateId(deck.id.clone()));
        }
    }

    let mut card_ids = HashSet::new();
    for card in &snapshot.cards {
        if !card_ids.insert(card.id.as_str()) {
            return Err(ValidationError::DuplicateId(card.id.clone()));
        }
        if !deck_ids.contains(card.deck_id.as_str()) {
            return Err(ValidationError::UnknownDeck {
                card_id: card.id.clone(),
                deck_id: card.deck_id.clone(),
            });
        }
    }

    Ok(())
}

fn valid_ease(ease_factor: f64) -> f64 {
    if ease_factor.is_nan() {
        INITIAL_EASE_FACTOR
    } else {
        ease_factor.max(MINIMUM_EASE_FACTOR)
    }
}

fn normalize_progress(record: &mut ProgressRecord) -> bool {
    let mut changed = false;
    if record.interval < 1 {
        record.interval = 1;
        changed = true;
    }
    let ease = valid_ease(record.ease_factor);
    if ease != record.ease_factor {
        record.ease_factor = ease;
        changed = true;
    }
    let answered = record.correct + record.incorrect;
    if answered > 0 && record.review_count != answered {
        record.review_count = answered;
        changed = true;
    }
    changed
}

/// Fix cross-entity references and out-of-range fields.
///
/// Cards that point at a missing deck move to the default deck, which is
/// created when absent. Everything touched gets `now` as its new version so
/// the fix survives the next merge.
pub fn validate_and_repair(snapshot: &Snapshot, now: DateTime<Utc>) -> (Snapshot, RepairReport) {
    let mut repaired = snapshot.clone();
    let mut report = RepairReport::default();

    let has_orphans = {
        let deck_ids: HashSet<&str> = repaired.decks.iter().map(|d| d.id.as_str()).collect();
        repaired
            .cards
            .iter()
            .any(|c| !deck_ids.contains(c.deck_id.as_str()))
    };
    if has_orphans && repaired.deck(DEFAULT_DECK_ID).is_none() {
        repaired.decks.push(Deck::default_deck(now));
        report.created_default_deck = true;
    }

    let deck_names: HashMap<String, String> = repaired
        .decks
        .iter()
        .map(|d| (d.id.clone(), d.name.clone()))
        .collect();

    for card in &mut repaired.cards {
        let mut touched = false;

        if !deck_names.contains_key(&card.deck_id) {
            card.deck_id = DEFAULT_DECK_ID.to_string();
            report.reassigned_cards.push(card.id.clone());
            touched = true;
        }
        if let Some(name) = deck_names.get(&card.deck_id) {
            if &card.deck_name != name {
                card.deck_name = name.clone();
                report.refreshed_deck_names += 1;
                touched = true;
            }
        }

        let ease = valid_ease(card.ease_factor);
        if card.interval < 1 || ease != card.ease_factor {
            card.interval = card.interval.max(1);
            card.ease_factor = ease;
            report.normalized_cards += 1;
            touched = true;
        }

        if touched {
            card.updated_at = Some(now);
        }
    }

    let card_ids: HashSet<&str> = repaired.cards.iter().map(|c| c.id.as_str()).collect();
    for (card_id, record) in repaired.progress.iter_mut() {
        if normalize_progress(record) {
            record.last_updated = Some(now);
            report.normalized_progress += 1;
        }
        if !card_ids.contains(card_id.as_str()) {
            report.dangling_progress.push(card_id.clone());
        }
    }

    (repaired, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Card, CardContent, Difficulty};
    use pretty_assertions::assert_eq;

    fn card(deck: &Deck, front: &str) -> Card {
        Card::new(
            deck,
            CardContent::Basic {
                front: front.into(),
                back: "back".into(),
            },
            Difficulty::Medium,
            Utc::now(),
        )
    }

    #[test]
    fn clean_snapshot_is_untouched() {
        let now = Utc::now();
        let deck = Deck::new("Rust", "#f97316", "crab", now);
        let snapshot = Snapshot {
            cards: vec![card(&deck, "a")],
            decks: vec![deck],
            ..Default::default()
        };

        assert_eq!(validate(&snapshot), Ok(()));
        let (repaired, report) = validate_and_repair(&snapshot, now);
        assert!(report.is_clean());
        assert_eq!(repaired, snapshot);
    }

    #[test]
    fn orphaned_cards_move_to_new_default_deck() {
        let now = Utc::now();
        let gone = Deck::new("Deleted", "#000", "trash", now);
        let kept = Deck::new("Kept", "#fff", "star", now);
        let orphan = card(&gone, "orphan");
        let fine = card(&kept, "fine");
        let snapshot = Snapshot {
            decks: vec![kept.clone()],
            cards: vec![orphan.clone(), fine.clone()],
            ..Default::default()
        };

        assert_eq!(
            validate(&snapshot),
            Err(ValidationError::UnknownDeck {
                card_id: orphan.id.clone(),
                deck_id: gone.id.clone(),
            })
        );

        let (repaired, report) = validate_and_repair(&snapshot, now);
        assert!(report.created_default_deck);
        assert_eq!(report.reassigned_cards, vec![orphan.id.clone()]);
        assert_eq!(repaired.decks.len(), 2);

        let moved = repaired.card(&orphan.id).unwrap();
        assert_eq!(moved.deck_id, DEFAULT_DECK_ID);
        assert_eq!(moved.deck_name, "Default");
        assert_eq!(moved.updated_at, Some(now));
        assert_eq!(repaired.card(&fine.id), Some(&fine));
        assert_eq!(validate(&repaired), Ok(()));
    }

    #[test]
    fn deck_less_cards_get_default_deck() {
        let now = Utc::now();
        let mut loose = card(&Deck::default_deck(now), "loose");
        loose.deck_id = String::new();
        let snapshot = Snapshot {
            cards: vec![loose],
            ..Default::default()
        };

        let (repaired, report) = validate_and_repair(&snapshot, now);
        assert!(report.created_default_deck);
        assert_eq!(repaired.decks.len(), 1);
        assert_eq!(repaired.cards[0].deck_id, DEFAULT_DECK_ID);
    }

    #[test]
    fn existing_default_deck_is_reused() {
        let now = Utc::now();
        let default = Deck::default_deck(now);
        let mut orphan = card(&default, "orphan");
        orphan.deck_id = "missing".into();
        let snapshot = Snapshot {
            decks: vec![default],
            cards: vec![orphan],
            ..Default::default()
        };

        let (repaired, report) = validate_and_repair(&snapshot, now);
        assert!(!report.created_default_deck);
        assert_eq!(repaired.decks.len(), 1);
        assert_eq!(report.reassigned_cards.len(), 1);
    }

    #[test]
    fn stale_deck_name_is_refreshed() {
        let now = Utc::now();
        let mut deck = Deck::new("Old name", "#000", "book", now);
        let c = card(&deck, "front");
        deck.name = "New name".into();
        let snapshot = Snapshot {
            decks: vec![deck],
            cards: vec![c],
            ..Default::default()
        };

        let (repaired, report) = validate_and_repair(&snapshot, now);
        assert_eq!(report.refreshed_deck_names, 1);
        assert_eq!(repaired.cards[0].deck_name, "New name");
    }

    #[test]
    fn scheduler_fields_are_clamped() {
        let now = Utc::now();
        let deck = Deck::default_deck(now);
        let mut c = card(&deck, "front");
        c.interval = 0;
        c.ease_factor = 0.5;
        let mut snapshot = Snapshot {
            progress: Default::default(),
            cards: vec![c.clone()],
            decks: vec![deck],
        };
        snapshot.progress.insert(
            c.id.clone(),
            ProgressRecord {
                correct: 2,
                incorrect: 1,
                review_count: 7,
                ease_factor: f64::NAN,
                interval: 0,
                ..Default::default()
            },
        );

        let (repaired, report) = validate_and_repair(&snapshot, now);
        assert_eq!(report.normalized_cards, 1);
        assert_eq!(report.normalized_progress, 1);
        assert_eq!(repaired.cards[0].interval, 1);
        assert_eq!(repaired.cards[0].ease_factor, 1.3);
        let record = &repaired.progress[&c.id];
        assert_eq!(record.review_count, 3);
        assert_eq!(record.ease_factor, 2.5);
        assert_eq!(record.interval, 1);
        assert_eq!(record.last_updated, Some(now));
    }

    #[test]
    fn dangling_progress_is_reported_not_removed() {
        let now = Utc::now();
        let mut snapshot = Snapshot {
            decks: vec![Deck::default_deck(now)],
            ..Default::default()
        };
        snapshot
            .progress
            .insert("deleted-card".into(), ProgressRecord::default());

        let (repaired, report) = validate_and_repair(&snapshot, now);
        assert_eq!(report.dangling_progress, vec!["deleted-card".to_string()]);
        assert!(repaired.progress.contains_key("deleted-card"));
        assert!(report.is_clean());
    }

    #[test]
    fn duplicate_and_empty_names_fail_validation() {
        let now = Utc::now();
        let deck = Deck::default_deck(now);
        let dup = Snapshot {
            decks: vec![deck.clone(), deck.clone()],
            ..Default::default()
        };
        assert_eq!(
            validate(&dup),
            Err(ValidationError::DuplicateId(DEFAULT_DECK_ID.into()))
        );

        let mut unnamed = deck;
        unnamed.name = "  ".into();
        let empty = Snapshot {
            decks: vec![unnamed],
            ..Default::default()
        };
        assert_eq!(validate(&empty), Err(ValidationError::EmptyName));
    }
}
