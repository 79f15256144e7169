//! Spaced repetition scheduling.
//!
//! Reviews are scored on a 0-5 quality scale and fed to the SM-2 update in
//! [`sm2`]. The helpers here convert UI answers into quality scores and copy a
//! scheduling result onto the stored card and progress record.

pub mod sm2;

pub use sm2::Sm2;

use crate::types::{Card, ProgressRecord, Rating, INITIAL_EASE_FACTOR};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lowest quality that still counts as a successful recall.
pub const PASSING_QUALITY: u8 = 3;

/// Quality used when a rating is missing or unrecognized.
pub const DEFAULT_QUALITY: u8 = 3;

impl Rating {
    /// SM-2 quality for this rating.
    pub fn quality(self) -> u8 {
        match self {
            Self::Again => 0,
            Self::Hard => 2,
            Self::Good => 3,
            Self::Easy => 5,
        }
    }
}

/// Quality for a rating name as sent by the study UI. Unknown names score 3.
pub fn quality_from_rating_name(name: &str) -> u8 {
    Rating::from_name(name).map_or(DEFAULT_QUALITY, Rating::quality)
}

/// Quality for a right/wrong answer, refined by an optional self-rating.
pub fn quality_from_answer(correct: bool, rating: Option<Rating>) -> u8 {
    match (correct, rating) {
        (false, _) => 0,
        (true, Some(rating)) => rating.quality(),
        (true, None) => DEFAULT_QUALITY,
    }
}

/// How the user answered a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReviewOutcome {
    /// Four-button rating.
    Rated { rating: Rating },
    /// Typed or multiple-choice answer checked for correctness.
    Answered {
        correct: bool,
        #[serde(default)]
        rating: Option<Rating>,
    },
    /// Quality already on the 0-5 scale. Not validated.
    Quality { quality: u8 },
}

impl ReviewOutcome {
    pub fn quality(&self) -> u8 {
        match *self {
            Self::Rated { rating } => rating.quality(),
            Self::Answered { correct, rating } => quality_from_answer(correct, rating),
            Self::Quality { quality } => quality,
        }
    }

    /// Rating to remember on the progress record, if one was given.
    pub fn rating(&self) -> Option<Rating> {
        match *self {
            Self::Rated { rating } => Some(rating),
            Self::Answered { rating, .. } => rating,
            Self::Quality { .. } => None,
        }
    }
}

/// The part of a card's state the SM-2 update reads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulerState {
    pub repetitions: u32,
    pub ease_factor: f64,
    pub interval: u32,
}

impl Default for SchedulerState {
    fn default() -> Self {
        Self {
            repetitions: 0,
            ease_factor: INITIAL_EASE_FACTOR,
            interval: 1,
        }
    }
}

impl SchedulerState {
    /// State from a progress record, or defaults for a card never reviewed.
    pub fn from_progress(record: Option<&ProgressRecord>) -> Self {
        match record {
            Some(r) => Self {
                repetitions: r.repetitions,
                ease_factor: r.ease_factor,
                interval: r.interval,
            },
            None => Self::default(),
        }
    }
}

/// Scheduler output for one review.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressUpdate {
    pub repetitions: u32,
    pub ease_factor: f64,
    pub interval: u32,
    pub next_review: DateTime<Utc>,
    pub last_reviewed: DateTime<Utc>,
    pub is_new: bool,
}

impl ProgressRecord {
    /// Fold one review into the record.
    pub fn record_review(
        &mut self,
        quality: u8,
        rating: Option<Rating>,
        update: &ProgressUpdate,
        now: DateTime<Utc>,
    ) {
        if quality >= PASSING_QUALITY {
            self.correct += 1;
        } else {
            self.incorrect += 1;
        }
        self.review_count += 1;
        self.repetitions = update.repetitions;
        self.ease_factor = update.ease_factor;
        self.interval = update.interval;
        self.last_reviewed = Some(update.last_reviewed);
        self.next_review = Some(update.next_review);
        self.is_new = update.is_new;
        self.last_rating = rating;
        self.last_quality = Some(quality);
        self.last_updated = Some(now);
    }
}

impl Card {
    /// Copy scheduler output onto the card.
    pub fn apply_schedule(&mut self, update: &ProgressUpdate, now: DateTime<Utc>) {
        self.repetitions = update.repetitions;
        self.ease_factor = update.ease_factor;
        self.interval = update.interval;
        self.next_review = update.next_review;
        self.last_reviewed = Some(update.last_reviewed);
        self.is_new = update.is_new;
        self.updated_at = Some(now);
    }
}
