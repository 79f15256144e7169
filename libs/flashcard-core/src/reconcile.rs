//! Two-sided merge of local and remote snapshots.
//!
//! Every entity is merged on its own: decks and cards by their version
//! timestamp (`updated_at`, else `created_at`), progress records by
//! `last_updated`. The local side seeds the result and a remote entity only
//! replaces its local counterpart when it is strictly newer, so ties keep the
//! local copy.
//!
//! No cross-entity repair happens here; see [`crate::repair`].

use crate::types::{Card, Deck, ProgressMap, ProgressRecord, Snapshot};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// An entity that carries its own last-write timestamp.
pub trait Versioned: Clone {
    fn id(&self) -> &str;

    /// Timestamp of the last write. Missing timestamps count as the epoch.
    fn version(&self) -> DateTime<Utc>;
}

impl Versioned for Deck {
    fn id(&self) -> &str {
        &self.id
    }

    fn version(&self) -> DateTime<Utc> {
        self.updated_at.unwrap_or(self.created_at)
    }
}

impl Versioned for Card {
    fn id(&self) -> &str {
        &self.id
    }

    fn version(&self) -> DateTime<Utc> {
        self.updated_at.unwrap_or(self.created_at)
    }
}

fn progress_version(record: &ProgressRecord) -> DateTime<Utc> {
    record.last_updated.unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Which side an entity in the merged output came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeCounts {
    pub from_local: usize,
    pub from_remote: usize,
    /// Entities present on both sides where the remote copy won.
    pub remote_wins: usize,
    /// Extra entries sharing an id with an earlier entry on the same side.
    pub duplicate_ids: usize,
}

/// Per-collection merge counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub decks: MergeCounts,
    pub cards: MergeCounts,
    pub progress: MergeCounts,
}

/// Merge two entity collections, newest version per id. Output is sorted by id.
///
/// Ids are expected to be unique within each side. Duplicates collapse to
/// their newest copy (the first one on a tie) and are counted in
/// [`MergeCounts::duplicate_ids`], so such input does not merge back to itself.
pub fn merge_entities<T: Versioned>(remote: &[T], local: &[T]) -> Vec<T> {
    merge_entities_counted(remote, local).0
}

fn merge_entities_counted<T: Versioned>(remote: &[T], local: &[T]) -> (Vec<T>, MergeCounts) {
    let mut counts = MergeCounts::default();
    let mut merged: HashMap<&str, (&T, bool)> = HashMap::with_capacity(local.len());

    for entity in local {
        let replaces = match merged.get(entity.id()) {
            None => true,
            Some((existing, _)) => {
                counts.duplicate_ids += 1;
                entity.version() > existing.version()
            }
        };
        if replaces {
            merged.insert(entity.id(), (entity, false));
        }
    }

    let mut seen_remote = HashSet::with_capacity(remote.len());
    for entity in remote {
        if !seen_remote.insert(entity.id()) {
            counts.duplicate_ids += 1;
        }
        let replaces = match merged.get(entity.id()) {
            None => true,
            Some((existing, from_remote)) => {
                let newer = entity.version() > existing.version();
                if newer && !from_remote {
                    counts.remote_wins += 1;
                }
                newer
            }
        };
        if replaces {
            merged.insert(entity.id(), (entity, true));
        }
    }

    let mut out: Vec<(&T, bool)> = merged.into_values().collect();
    out.sort_by(|a, b| a.0.id().cmp(b.0.id()));
    for (_, remote) in &out {
        if *remote {
            counts.from_remote += 1;
        } else {
            counts.from_local += 1;
        }
    }

    (out.into_iter().map(|(entity, _)| entity.clone()).collect(), counts)
}

/// Merge progress maps. A remote record wins only if strictly newer.
pub fn merge_progress(remote: &ProgressMap, local: &ProgressMap) -> ProgressMap {
    merge_progress_counted(remote, local).0
}

fn merge_progress_counted(remote: &ProgressMap, local: &ProgressMap) -> (ProgressMap, MergeCounts) {
    let mut merged = local.clone();
    let mut counts = MergeCounts::default();

    for (card_id, record) in remote {
        let replaces = match merged.get(card_id) {
            None => true,
            Some(existing) => {
                let newer = progress_version(record) > progress_version(existing);
                if newer {
                    counts.remote_wins += 1;
                }
                newer
            }
        };
        if replaces {
            merged.insert(card_id.clone(), record.clone());
            counts.from_remote += 1;
        }
    }
    counts.from_local = merged.len() - counts.from_remote;

    (merged, counts)
}

/// Merge every collection of two snapshots.
pub fn merge_snapshots(remote: &Snapshot, local: &Snapshot) -> Snapshot {
    merge_snapshots_with_report(remote, local).0
}

/// [`merge_snapshots`] plus where each entity came from.
pub fn merge_snapshots_with_report(remote: &Snapshot, local: &Snapshot) -> (Snapshot, MergeReport) {
    let (decks, deck_counts) = merge_entities_counted(&remote.decks, &local.decks);
    let (cards, card_counts) = merge_entities_counted(&remote.cards, &local.cards);
    let (progress, progress_counts) = merge_progress_counted(&remote.progress, &local.progress);

    (
        Snapshot {
            decks,
            cards,
            progress,
        },
        MergeReport {
            decks: deck_counts,
            cards: card_counts,
            progress: progress_counts,
        },
    )
}

/// Where a reconciled snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeSource {
    /// Remote had no decks or cards; local taken as-is.
    Local,
    /// Local had no decks or cards; remote taken as-is.
    Remote,
    /// Entity-by-entity merge.
    Merged,
}

/// Result of [`reconcile`].
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub snapshot: Snapshot,
    pub source: MergeSource,
    pub report: MergeReport,
}

/// Merge with the empty-side short-circuit: when exactly one side has no
/// decks and no cards, the other side is taken unchanged.
pub fn reconcile(remote: &Snapshot, local: &Snapshot) -> Reconciled {
    match (remote.is_empty(), local.is_empty()) {
        (false, true) => Reconciled {
            snapshot: remote.clone(),
            source: MergeSource::Remote,
            report: MergeReport::default(),
        },
        (true, false) => Reconciled {
            snapshot: local.clone(),
            source: MergeSource::Local,
            report: MergeReport::default(),
        },
        _ => {
            let (snapshot, report) = merge_snapshots_with_report(remote, local);
            Reconciled {
                snapshot,
                source: MergeSource::Merged,
                report,
            }
        }
    }
}
