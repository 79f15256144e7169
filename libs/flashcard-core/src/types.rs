//! Core types for flashcard application.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Id of the deck that is recreated whenever cards would otherwise be deck-less.
pub const DEFAULT_DECK_ID: &str = "default";

/// Starting ease factor for cards that have never been reviewed.
pub const INITIAL_EASE_FACTOR: f64 = 2.5;

/// Ease factor floor.
pub const MINIMUM_EASE_FACTOR: f64 = 1.3;

/// Progress records keyed by card id.
pub type ProgressMap = BTreeMap<String, ProgressRecord>;

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

fn default_ease() -> f64 {
    INITIAL_EASE_FACTOR
}

fn default_interval() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

/// User-declared difficulty tag. Independent of scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Default for Difficulty {
    fn default() -> Self {
        Self::Medium
    }
}

/// Rating a user gives after answering a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    Again,
    Hard,
    Good,
    Easy,
}

impl Rating {
    /// All ratings, worst first.
    pub const ALL: [Rating; 4] = [Self::Again, Self::Hard, Self::Good, Self::Easy];

    /// Lowercase name as used by the study UI.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Again => "again",
            Self::Hard => "hard",
            Self::Good => "good",
            Self::Easy => "easy",
        }
    }

    /// Parse from lowercase name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "again" => Some(Self::Again),
            "hard" => Some(Self::Hard),
            "good" => Some(Self::Good),
            "easy" => Some(Self::Easy),
            _ => None,
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named grouping of cards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deck {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default = "epoch")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Deck {
    /// Create a deck with a fresh id.
    pub fn new(
        name: impl Into<String>,
        color: impl Into<String>,
        icon: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            description: None,
            color: color.into(),
            icon: icon.into(),
            created_at: now,
            updated_at: None,
        }
    }

    /// The reserved deck that holds cards when nothing else can.
    pub fn default_deck(now: DateTime<Utc>) -> Self {
        Self {
            id: DEFAULT_DECK_ID.to_string(),
            name: "Default".to_string(),
            description: Some("Cards without another deck".to_string()),
            color: "#6366f1".to_string(),
            icon: "layers".to_string(),
            created_at: now,
            updated_at: None,
        }
    }
}

/// Card content, tagged by `card_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "card_type", rename_all = "snake_case")]
pub enum CardContent {
    Basic {
        front: String,
        back: String,
    },
    Image {
        front: String,
        back: String,
        image_url: String,
    },
    Audio {
        front: String,
        back: String,
        audio_url: String,
    },
    MultipleChoice {
        question: String,
        options: Vec<String>,
        correct_option: usize,
    },
}

impl CardContent {
    /// Prompt shown before the answer is revealed.
    pub fn prompt(&self) -> &str {
        match self {
            Self::Basic { front, .. }
            | Self::Image { front, .. }
            | Self::Audio { front, .. } => front,
            Self::MultipleChoice { question, .. } => question,
        }
    }
}

/// A single flashcard with its scheduler-owned fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    #[serde(default)]
    pub deck_id: String,
    #[serde(default)]
    pub deck_name: String,
    #[serde(flatten)]
    pub content: CardContent,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default = "epoch")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_reviewed: Option<DateTime<Utc>>,
    #[serde(default = "epoch")]
    pub next_review: DateTime<Utc>,
    #[serde(default = "default_interval")]
    pub interval: u32,
    #[serde(default = "default_ease")]
    pub ease_factor: f64,
    #[serde(default)]
    pub repetitions: u32,
    #[serde(default = "default_true")]
    pub is_new: bool,
}

impl Card {
    /// Create a card in `deck` with default scheduler state.
    pub fn new(
        deck: &Deck,
        content: CardContent,
        difficulty: Difficulty,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            deck_id: deck.id.clone(),
            deck_name: deck.name.clone(),
            content,
            difficulty,
            created_at: now,
            updated_at: None,
            last_reviewed: None,
            next_review: now,
            interval: 1,
            ease_factor: INITIAL_EASE_FACTOR,
            repetitions: 0,
            is_new: true,
        }
    }

    /// Put the scheduler-owned fields back to their never-reviewed values.
    pub fn reset_schedule(&mut self, now: DateTime<Utc>) {
        self.last_reviewed = None;
        self.next_review = now;
        self.interval = 1;
        self.ease_factor = INITIAL_EASE_FACTOR;
        self.repetitions = 0;
        self.is_new = true;
        self.updated_at = Some(now);
    }
}

/// Per-card review history and scheduler state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressRecord {
    pub correct: u32,
    pub incorrect: u32,
    pub review_count: u32,
    pub repetitions: u32,
    pub ease_factor: f64,
    pub interval: u32,
    pub last_reviewed: Option<DateTime<Utc>>,
    pub next_review: Option<DateTime<Utc>>,
    pub last_updated: Option<DateTime<Utc>>,
    pub is_new: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_rating: Option<Rating>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_quality: Option<u8>,
}

impl Default for ProgressRecord {
    fn default() -> Self {
        Self {
            correct: 0,
            incorrect: 0,
            review_count: 0,
            repetitions: 0,
            ease_factor: INITIAL_EASE_FACTOR,
            interval: 1,
            last_reviewed: None,
            next_review: None,
            last_updated: None,
            is_new: true,
            last_rating: None,
            last_quality: None,
        }
    }
}

impl ProgressRecord {
    /// Zero state, stamped so it wins the next merge.
    pub fn reset(now: DateTime<Utc>) -> Self {
        Self {
            next_review: Some(now),
            last_updated: Some(now),
            ..Self::default()
        }
    }
}

/// Which collection of a snapshot an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    Decks,
    Cards,
    Progress,
}

impl CollectionKind {
    pub const ALL: [CollectionKind; 3] = [Self::Decks, Self::Cards, Self::Progress];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Decks => "decks",
            Self::Cards => "cards",
            Self::Progress => "progress",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "decks" => Some(Self::Decks),
            "cards" => Some(Self::Cards),
            "progress" => Some(Self::Progress),
            _ => None,
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One collection's full contents.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Collection {
    Decks(Vec<Deck>),
    Cards(Vec<Card>),
    Progress(ProgressMap),
}

impl Collection {
    pub fn kind(&self) -> CollectionKind {
        match self {
            Self::Decks(_) => CollectionKind::Decks,
            Self::Cards(_) => CollectionKind::Cards,
            Self::Progress(_) => CollectionKind::Progress,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Decks(decks) => decks.len(),
            Self::Cards(cards) => cards.len(),
            Self::Progress(progress) => progress.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Decks, cards and progress from one source at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub decks: Vec<Deck>,
    pub cards: Vec<Card>,
    pub progress: ProgressMap,
}

impl Snapshot {
    /// True when there are no decks and no cards. Progress alone does not count.
    pub fn is_empty(&self) -> bool {
        self.decks.is_empty() && self.cards.is_empty()
    }

    /// Clone out one collection.
    pub fn collection(&self, kind: CollectionKind) -> Collection {
        match kind {
            CollectionKind::Decks => Collection::Decks(self.decks.clone()),
            CollectionKind::Cards => Collection::Cards(self.cards.clone()),
            CollectionKind::Progress => Collection::Progress(self.progress.clone()),
        }
    }

    /// Replace one collection.
    pub fn set_collection(&mut self, collection: Collection) {
        match collection {
            Collection::Decks(decks) => self.decks = decks,
            Collection::Cards(cards) => self.cards = cards,
            Collection::Progress(progress) => self.progress = progress,
        }
    }

    pub fn deck(&self, id: &str) -> Option<&Deck> {
        self.decks.iter().find(|d| d.id == id)
    }

    pub fn card(&self, id: &str) -> Option<&Card> {
        self.cards.iter().find(|c| c.id == id)
    }
}
