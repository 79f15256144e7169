//! Learning statistics over cards and progress.

use crate::types::{Card, Difficulty, ProgressMap, ProgressRecord};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Repetition count from which a card counts as mastered.
pub const MASTERED_REPETITIONS: u32 = 3;

/// Cards partitioned by learning stage.
///
/// `new + learning + review + mastered == total`. `overdue` is the part of
/// `review` whose next review has passed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LearningStats {
    pub total: usize,
    pub new: usize,
    pub learning: usize,
    pub review: usize,
    pub overdue: usize,
    pub mastered: usize,
}

/// Card counts per declared difficulty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DifficultyCounts {
    pub easy: usize,
    pub medium: usize,
    pub hard: usize,
}

/// Aggregate review metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DetailedMetrics {
    pub total_reviews: u64,
    pub correct: u64,
    pub incorrect: u64,
    /// Percentage of correct answers, 0 when nothing was answered.
    pub accuracy: f64,
    pub average_ease: f64,
    pub average_interval: f64,
    pub by_difficulty: DifficultyCounts,
    pub learning: LearningStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    New,
    Learning,
    Review { overdue: bool },
    Mastered,
}

fn stage(record: Option<&ProgressRecord>, now: DateTime<Utc>) -> Stage {
    match record {
        None => Stage::New,
        Some(r) if r.is_new => Stage::New,
        Some(r) if r.repetitions == 0 => Stage::Learning,
        Some(r) if r.repetitions < MASTERED_REPETITIONS => Stage::Review {
            overdue: r.next_review.map_or(false, |next| next < now),
        },
        Some(_) => Stage::Mastered,
    }
}

/// Partition cards by learning stage.
pub fn learning_stats(cards: &[Card], progress: &ProgressMap, now: DateTime<Utc>) -> LearningStats {
    let mut stats = LearningStats {
        total: cards.len(),
        ..Default::default()
    };

    for card in cards {
        match stage(progress.get(&card.id), now) {
            Stage::New => stats.new += 1,
            Stage::Learning => stats.learning += 1,
            Stage::Review { overdue } => {
                stats.review += 1;
                if overdue {
                    stats.overdue += 1;
                }
            }
            Stage::Mastered => stats.mastered += 1,
        }
    }

    stats
}

/// Review totals, accuracy and averages across cards that have progress.
pub fn detailed_metrics(
    cards: &[Card],
    progress: &ProgressMap,
    now: DateTime<Utc>,
) -> DetailedMetrics {
    let mut metrics = DetailedMetrics::default();
    let mut ease_sum = 0.0;
    let mut interval_sum = 0.0;
    let mut with_progress = 0usize;

    for card in cards {
        match card.difficulty {
            Difficulty::Easy => metrics.by_difficulty.easy += 1,
            Difficulty::Medium => metrics.by_difficulty.medium += 1,
            Difficulty::Hard => metrics.by_difficulty.hard += 1,
        }

        if let Some(record) = progress.get(&card.id) {
            metrics.total_reviews += u64::from(record.review_count);
            metrics.correct += u64::from(record.correct);
            metrics.incorrect += u64::from(record.incorrect);
            ease_sum += record.ease_factor;
            interval_sum += f64::from(record.interval);
            with_progress += 1;
        }
    }

    let answered = metrics.correct + metrics.incorrect;
    if answered > 0 {
        metrics.accuracy = metrics.correct as f64 / answered as f64 * 100.0;
    }
    if with_progress > 0 {
        metrics.average_ease = ease_sum / with_progress as f64;
        metrics.average_interval = interval_sum / with_progress as f64;
    }
    metrics.learning = learning_stats(cards, progress, now);

    metrics
}
