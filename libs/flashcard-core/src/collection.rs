//! Deck and card edits on a snapshot.
//!
//! Every edit validates its input, applies the change, and stamps the touched
//! entities with `now` so the edit wins the next merge.

use crate::error::{Result, ValidationError};
use crate::types::{Card, Deck, ProgressRecord, Snapshot};
use chrono::{DateTime, Utc};

/// Partial deck update. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct DeckUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub color: Option<String>,
    pub icon: Option<String>,
}

/// Add a deck.
pub fn add_deck(snapshot: &mut Snapshot, deck: Deck) -> Result<()> {
    if deck.name.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }
    if snapshot.deck(&deck.id).is_some() {
        return Err(ValidationError::DuplicateId(deck.id));
    }
    snapshot.decks.push(deck);
    Ok(())
}

/// Edit a deck. A rename is copied into the cached `deck_name` of its cards.
pub fn update_deck(
    snapshot: &mut Snapshot,
    deck_id: &str,
    update: DeckUpdate,
    now: DateTime<Utc>,
) -> Result<Deck> {
    if let Some(name) = &update.name {
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
    }

    let deck = snapshot
        .decks
        .iter_mut()
        .find(|d| d.id == deck_id)
        .ok_or_else(|| ValidationError::DeckNotFound(deck_id.to_string()))?;

    if let Some(name) = update.name {
        deck.name = name;
    }
    if let Some(description) = update.description {
        deck.description = description;
    }
    if let Some(color) = update.color {
        deck.color = color;
    }
    if let Some(icon) = update.icon {
        deck.icon = icon;
    }
    deck.updated_at = Some(now);
    let updated = deck.clone();

    for card in snapshot.cards.iter_mut().filter(|c| c.deck_id == deck_id) {
        if card.deck_name != updated.name {
            card.deck_name = updated.name.clone();
            card.updated_at = Some(now);
        }
    }

    Ok(updated)
}

/// Delete a deck and every card in it. Returns the ids of the removed cards.
///
/// The last remaining deck cannot be deleted.
pub fn delete_deck(snapshot: &mut Snapshot, deck_id: &str) -> Result<Vec<String>> {
    if snapshot.deck(deck_id).is_none() {
        return Err(ValidationError::DeckNotFound(deck_id.to_string()));
    }
    if snapshot.decks.len() <= 1 {
        return Err(ValidationError::LastDeck);
    }

    snapshot.decks.retain(|d| d.id != deck_id);
    let removed: Vec<String> = snapshot
        .cards
        .iter()
        .filter(|c| c.deck_id == deck_id)
        .map(|c| c.id.clone())
        .collect();
    snapshot.cards.retain(|c| c.deck_id != deck_id);

    Ok(removed)
}

/// Add a card. Its deck must exist; the cached deck name is filled in.
pub fn add_card(snapshot: &mut Snapshot, mut card: Card) -> Result<()> {
    let deck = snapshot
        .deck(&card.deck_id)
        .ok_or_else(|| ValidationError::UnknownDeck {
            card_id: card.id.clone(),
            deck_id: card.deck_id.clone(),
        })?;
    if snapshot.card(&card.id).is_some() {
        return Err(ValidationError::DuplicateId(card.id));
    }
    card.deck_name = deck.name.clone();
    snapshot.cards.push(card);
    Ok(())
}

/// Replace a card's editable fields. `id` and `created_at` are preserved.
pub fn update_card(snapshot: &mut Snapshot, card: Card, now: DateTime<Utc>) -> Result<Card> {
    let deck_name = snapshot
        .deck(&card.deck_id)
        .map(|d| d.name.clone())
        .ok_or_else(|| ValidationError::UnknownDeck {
            card_id: card.id.clone(),
            deck_id: card.deck_id.clone(),
        })?;

    let existing = snapshot
        .cards
        .iter_mut()
        .find(|c| c.id == card.id)
        .ok_or_else(|| ValidationError::CardNotFound(card.id.clone()))?;

    let created_at = existing.created_at;
    *existing = Card {
        deck_name,
        created_at,
        updated_at: Some(now),
        ..card
    };

    Ok(existing.clone())
}

/// Remove a card. Its progress record stays until progress is reset.
pub fn delete_card(snapshot: &mut Snapshot, card_id: &str) -> Result<Card> {
    let index = snapshot
        .cards
        .iter()
        .position(|c| c.id == card_id)
        .ok_or_else(|| ValidationError::CardNotFound(card_id.to_string()))?;
    Ok(snapshot.cards.remove(index))
}

/// Reinitialize every progress record and card schedule.
pub fn reset_progress(snapshot: &mut Snapshot, now: DateTime<Utc>) {
    for record in snapshot.progress.values_mut() {
        *record = ProgressRecord::reset(now);
    }
    for card in &mut snapshot.cards {
        card.reset_schedule(now);
    }
}

/// A snapshot holding nothing but the default deck.
pub fn clear_all(now: DateTime<Utc>) -> Snapshot {
    Snapshot {
        decks: vec![Deck::default_deck(now)],
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CardContent, Difficulty, DEFAULT_DECK_ID};
    use pretty_assertions::assert_eq;

    fn card(deck: &Deck, front: &str, now: DateTime<Utc>) -> Card {
        Card::new(
            deck,
            CardContent::Basic {
                front: front.into(),
                back: "back".into(),
            },
            Difficulty::Medium,
            now,
        )
    }

    fn two_decks(now: DateTime<Utc>) -> (Snapshot, Deck, Deck) {
        let rust = Deck::new("Rust", "#f97316", "crab", now);
        let go = Deck::new("Go", "#06b6d4", "gopher", now);
        let snapshot = Snapshot {
            decks: vec![rust.clone(), go.clone()],
            cards: vec![
                card(&rust, "ownership", now),
                card(&rust, "lifetimes", now),
                card(&go, "channels", now),
            ],
            ..Default::default()
        };
        (snapshot, rust, go)
    }

    #[test]
    fn delete_deck_cascades_to_cards() {
        let now = Utc::now();
        let (mut snapshot, rust, go) = two_decks(now);

        let removed = delete_deck(&mut snapshot, &rust.id).unwrap();
        assert_eq!(removed.len(), 2);
        assert_eq!(snapshot.decks, vec![go.clone()]);
        assert_eq!(snapshot.cards.len(), 1);
        assert_eq!(snapshot.cards[0].deck_id, go.id);
    }

    #[test]
    fn last_deck_cannot_be_deleted() {
        let now = Utc::now();
        let mut snapshot = clear_all(now);
        assert_eq!(
            delete_deck(&mut snapshot, DEFAULT_DECK_ID),
            Err(ValidationError::LastDeck)
        );
        assert_eq!(snapshot.decks.len(), 1);
    }

    #[test]
    fn delete_unknown_deck() {
        let now = Utc::now();
        let (mut snapshot, _, _) = two_decks(now);
        assert_eq!(
            delete_deck(&mut snapshot, "nope"),
            Err(ValidationError::DeckNotFound("nope".into()))
        );
    }

    #[test]
    fn add_card_requires_live_deck() {
        let now = Utc::now();
        let (mut snapshot, _, _) = two_decks(now);
        let ghost = Deck::new("Ghost", "#000", "ghost", now);
        let c = card(&ghost, "boo", now);

        let err = add_card(&mut snapshot, c.clone()).unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnknownDeck {
                card_id: c.id,
                deck_id: ghost.id,
            }
        );
    }

    #[test]
    fn add_card_fills_deck_name() {
        let now = Utc::now();
        let (mut snapshot, rust, _) = two_decks(now);
        let mut c = card(&rust, "traits", now);
        c.deck_name = String::new();

        add_card(&mut snapshot, c.clone()).unwrap();
        assert_eq!(snapshot.card(&c.id).unwrap().deck_name, "Rust");
        assert_eq!(
            add_card(&mut snapshot, c.clone()),
            Err(ValidationError::DuplicateId(c.id))
        );
    }

    #[test]
    fn rename_deck_updates_cached_names() {
        let now = Utc::now();
        let (mut snapshot, rust, _) = two_decks(now);
        let later = now + chrono::Duration::seconds(5);

        let updated = update_deck(
            &mut snapshot,
            &rust.id,
            DeckUpdate {
                name: Some("Rust 2024".into()),
                ..Default::default()
            },
            later,
        )
        .unwrap();

        assert_eq!(updated.name, "Rust 2024");
        assert_eq!(updated.updated_at, Some(later));
        for c in snapshot.cards.iter().filter(|c| c.deck_id == rust.id) {
            assert_eq!(c.deck_name, "Rust 2024");
            assert_eq!(c.updated_at, Some(later));
        }
    }

    #[test]
    fn rename_to_blank_is_rejected() {
        let now = Utc::now();
        let (mut snapshot, rust, _) = two_decks(now);
        let result = update_deck(
            &mut snapshot,
            &rust.id,
            DeckUpdate {
                name: Some("".into()),
                ..Default::default()
            },
            now,
        );
        assert_eq!(result, Err(ValidationError::EmptyName));
    }

    #[test]
    fn update_card_keeps_identity() {
        let now = Utc::now();
        let (mut snapshot, _, go) = two_decks(now);
        let original = snapshot.cards[0].clone();
        let later = now + chrono::Duration::seconds(1);

        let mut edited = original.clone();
        edited.deck_id = go.id.clone();
        edited.created_at = later;
        edited.difficulty = Difficulty::Hard;

        let stored = update_card(&mut snapshot, edited, later).unwrap();
        assert_eq!(stored.created_at, original.created_at);
        assert_eq!(stored.deck_name, "Go");
        assert_eq!(stored.difficulty, Difficulty::Hard);
        assert_eq!(stored.updated_at, Some(later));
    }

    #[test]
    fn reset_progress_zeroes_everything() {
        let now = Utc::now();
        let (mut snapshot, _, _) = two_decks(now);
        let id = snapshot.cards[0].id.clone();
        snapshot.cards[0].repetitions = 4;
        snapshot.cards[0].is_new = false;
        snapshot.progress.insert(
            id.clone(),
            ProgressRecord {
                correct: 4,
                review_count: 4,
                repetitions: 4,
                is_new: false,
                ..Default::default()
            },
        );

        reset_progress(&mut snapshot, now);
        assert_eq!(snapshot.progress[&id], ProgressRecord::reset(now));
        assert_eq!(snapshot.cards[0].repetitions, 0);
        assert!(snapshot.cards[0].is_new);
    }

    #[test]
    fn delete_card_leaves_progress() {
        let now = Utc::now();
        let (mut snapshot, _, _) = two_decks(now);
        let id = snapshot.cards[0].id.clone();
        snapshot.progress.insert(id.clone(), ProgressRecord::default());

        let removed = delete_card(&mut snapshot, &id).unwrap();
        assert_eq!(removed.id, id);
        assert!(snapshot.card(&id).is_none());
        assert!(snapshot.progress.contains_key(&id));
    }
}
