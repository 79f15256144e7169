//! SM-2 spaced repetition algorithm.
//!
//! Based on SuperMemo 2 with configurable parameters.

use super::{ProgressUpdate, SchedulerState, PASSING_QUALITY};
use crate::types::{ProgressRecord, Rating, INITIAL_EASE_FACTOR, MINIMUM_EASE_FACTOR};
use chrono::{DateTime, Duration, Utc};

/// SM-2 algorithm with configurable parameters.
#[derive(Debug, Clone)]
pub struct Sm2 {
    pub initial_ease: f64,
    pub minimum_ease: f64,
    pub first_interval: u32,
    pub second_interval: u32,
    /// Longest interval in days a review can schedule.
    pub maximum_interval: u32,
}

/// About one hundred years.
pub const DEFAULT_MAXIMUM_INTERVAL: u32 = 36_500;

impl Default for Sm2 {
    fn default() -> Self {
        Self {
            initial_ease: INITIAL_EASE_FACTOR,
            minimum_ease: MINIMUM_EASE_FACTOR,
            first_interval: 1,
            second_interval: 6,
            maximum_interval: DEFAULT_MAXIMUM_INTERVAL,
        }
    }
}

impl Sm2 {
    /// State of a card that has never been reviewed.
    pub fn initial_state(&self) -> SchedulerState {
        SchedulerState {
            repetitions: 0,
            ease_factor: self.initial_ease,
            interval: self.first_interval.max(1),
        }
    }

    /// State from a progress record, or [`initial_state`](Self::initial_state)
    /// for a card never reviewed.
    pub fn state_from_progress(&self, record: Option<&ProgressRecord>) -> SchedulerState {
        match record {
            Some(record) => SchedulerState::from_progress(Some(record)),
            None => self.initial_state(),
        }
    }

    /// Ease factor after a review of the given quality, floored at `minimum_ease`.
    pub fn next_ease(&self, ease_factor: f64, quality: u8) -> f64 {
        let miss = 5.0 - f64::from(quality);
        let adjusted = ease_factor + (0.1 - miss * (0.08 + miss * 0.02));
        adjusted.max(self.minimum_ease)
    }

    /// Schedule the next review.
    ///
    /// A quality below 3 is a lapse and restarts the learning sequence. The
    /// third and later successful repetitions grow the card's stored interval
    /// by the new ease factor, up to `maximum_interval`.
    pub fn update_progress(
        &self,
        prior: &SchedulerState,
        quality: u8,
        now: DateTime<Utc>,
    ) -> ProgressUpdate {
        let ease_factor = self.next_ease(prior.ease_factor, quality);

        let (repetitions, interval) = if quality < PASSING_QUALITY {
            (0, 1)
        } else {
            let repetitions = prior.repetitions + 1;
            let interval = match repetitions {
                1 => self.first_interval,
                2 => self.second_interval,
                _ => (f64::from(prior.interval) * ease_factor).round() as u32,
            };
            (repetitions, interval.clamp(1, self.maximum_interval.max(1)))
        };

        let next_review = now
            .checked_add_signed(Duration::days(i64::from(interval)))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        ProgressUpdate {
            repetitions,
            ease_factor,
            interval,
            next_review,
            last_reviewed: now,
            is_new: false,
        }
    }

    /// Interval in days each rating would produce, in `Rating::ALL` order.
    pub fn preview_intervals(&self, prior: &SchedulerState, now: DateTime<Utc>) -> [u32; 4] {
        Rating::ALL.map(|rating| self.update_progress(prior, rating.quality(), now).interval)
    }
}
