//! Sync orchestrator.
//!
//! Reads both stores, reconciles them, and writes the result back. The local
//! store is the hard durability guarantee: every write lands there first and
//! a local failure fails the operation. Remote writes are best-effort except
//! in [`SyncOrchestrator::force_sync`], which requires a connection.

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::store::{HttpRemoteStore, LocalStore, RemoteStore, SqliteLocalStore};
use chrono::{DateTime, Utc};
use flashcard_core::collection::{self, DeckUpdate};
use flashcard_core::reconcile::{merge_snapshots_with_report, MergeReport};
use flashcard_core::types::{Card, Collection, CollectionKind, Deck, ProgressRecord, Snapshot};
use flashcard_core::{
    detailed_metrics, due_cards, learning_stats, reconcile, validate_and_repair, DetailedMetrics,
    LearningStats, MergeSource, RepairReport, ReviewOutcome, Sm2, ValidationError,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Per-collection sync status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SyncState {
    /// Only ever seen locally.
    Unsynced,
    Synced { synced_at: DateTime<Utc> },
}

/// What happened to the remote half of a write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum RemoteWrite {
    Saved,
    /// Remote was not reachable; nothing attempted.
    Skipped,
    /// Remote was reachable but the write failed. The local write stands.
    Failed(String),
}

/// Outcome of writing one collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteReport {
    pub kind: CollectionKind,
    pub remote: RemoteWrite,
}

/// A value produced by an edit, plus how its writes went.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Applied<T> {
    pub value: T,
    pub writes: Vec<WriteReport>,
}

impl<T> Applied<T> {
    /// True when any remote write was attempted and failed.
    pub fn remote_failed(&self) -> bool {
        self.writes
            .iter()
            .any(|w| matches!(w.remote, RemoteWrite::Failed(_)))
    }
}

/// Result of a forced sync.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncReport {
    pub snapshot: Snapshot,
    pub merge: MergeReport,
    pub repair: RepairReport,
    pub synced_at: DateTime<Utc>,
}

/// Result of reviewing one card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewResult {
    pub card: Card,
    pub progress: ProgressRecord,
    pub quality: u8,
    pub writes: Vec<WriteReport>,
}

/// Snapshot read for an operation, and where it came from.
struct Loaded {
    snapshot: Snapshot,
    /// `None` when the remote was not consulted.
    source: Option<MergeSource>,
    /// The remote answered with at least one deck or card.
    remote_has_data: bool,
    /// Repair changed the merged snapshot.
    repaired: bool,
}

impl Loaded {
    fn local_only(snapshot: Snapshot) -> Self {
        Self {
            snapshot,
            source: None,
            remote_has_data: false,
            repaired: false,
        }
    }

    /// Kinds that must be written back so both stores hold the loaded state.
    fn stale_kinds(&self) -> &'static [CollectionKind] {
        if self.source.is_some() {
            &CollectionKind::ALL
        } else {
            &[]
        }
    }

    /// Kinds to write back after reading `kind`. A repair can touch every
    /// collection, so a repaired snapshot goes back whole.
    fn read_kinds(&self, kind: CollectionKind) -> Vec<CollectionKind> {
        if self.repaired {
            CollectionKind::ALL.to_vec()
        } else {
            vec![kind]
        }
    }
}

struct Inner {
    local: Arc<dyn LocalStore>,
    remote: Arc<dyn RemoteStore>,
    probe_timeout: Duration,
    sync_states: Mutex<BTreeMap<CollectionKind, DateTime<Utc>>>,
}

/// Coordinates the local and remote stores.
///
/// Clone-able because all state sits behind an `Arc`. No lock is held across
/// an await point, so clones may be used from concurrent tasks; concurrent
/// writes to the same collection resolve as last write wins.
#[derive(Clone)]
pub struct SyncOrchestrator {
    inner: Arc<Inner>,
    scheduler: Sm2,
}

impl SyncOrchestrator {
    pub fn new(
        local: Arc<dyn LocalStore>,
        remote: Arc<dyn RemoteStore>,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                local,
                remote,
                probe_timeout,
                sync_states: Mutex::new(BTreeMap::new()),
            }),
            scheduler: Sm2::default(),
        }
    }

    /// SQLite at the configured path and the HTTP backend for the configured account.
    pub fn from_config(config: &SyncConfig) -> Result<Self> {
        let local = SqliteLocalStore::open(&config.database_path)?;
        let remote = HttpRemoteStore::from_config(config);
        info!(
            database = %config.database_path.display(),
            backend = %config.backend_url,
            account = %config.account_id,
            "sync orchestrator configured"
        );
        Ok(Self::new(
            Arc::new(local),
            Arc::new(remote),
            config.probe_timeout,
        ))
    }

    /// Replace the scheduler parameters.
    pub fn with_scheduler(mut self, scheduler: Sm2) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Probe the remote with the configured timeout.
    pub async fn is_online(&self) -> bool {
        let online = self
            .inner
            .remote
            .probe_connectivity(self.inner.probe_timeout)
            .await;
        debug!(online, "connectivity probe");
        online
    }

    pub async fn sync_state(&self, kind: CollectionKind) -> SyncState {
        match self.inner.sync_states.lock().await.get(&kind) {
            Some(&synced_at) => SyncState::Synced { synced_at },
            None => SyncState::Unsynced,
        }
    }

    // === Reads ===

    /// Current contents of one collection.
    ///
    /// Offline, or when the remote read fails, this is the local copy. Online
    /// the two sides are reconciled and the result written back to both.
    pub async fn read(&self, kind: CollectionKind) -> Result<Collection> {
        let loaded = self.load().await?;
        self.write_back(&loaded, &loaded.read_kinds(kind)).await?;
        Ok(loaded.snapshot.collection(kind))
    }

    /// All three collections, reconciled the same way as [`read`](Self::read).
    pub async fn snapshot(&self) -> Result<Snapshot> {
        let loaded = self.load().await?;
        self.write_back(&loaded, loaded.stale_kinds()).await?;
        Ok(loaded.snapshot)
    }

    pub async fn due_cards(&self, deck_id: Option<&str>) -> Result<Vec<Card>> {
        let snapshot = self.snapshot().await?;
        Ok(due_cards(
            &snapshot.cards,
            &snapshot.progress,
            deck_id,
            Utc::now(),
        ))
    }

    pub async fn stats(&self) -> Result<LearningStats> {
        let snapshot = self.snapshot().await?;
        Ok(learning_stats(&snapshot.cards, &snapshot.progress, Utc::now()))
    }

    pub async fn detailed_metrics(&self) -> Result<DetailedMetrics> {
        let snapshot = self.snapshot().await?;
        Ok(detailed_metrics(
            &snapshot.cards,
            &snapshot.progress,
            Utc::now(),
        ))
    }

    // === Writes ===

    /// Persist one collection locally, then to the remote if reachable.
    pub async fn write(&self, collection: Collection) -> Result<WriteReport> {
        let kind = collection.kind();
        self.inner.local.save(&collection)?;

        let remote = if self.is_online().await {
            self.remote_save(&collection).await
        } else {
            RemoteWrite::Skipped
        };
        Ok(WriteReport { kind, remote })
    }

    /// Fetch both sides, merge unconditionally, repair, and write the result
    /// to both. Fails with [`SyncError::Offline`] when the remote is unreachable.
    pub async fn force_sync(&self) -> Result<SyncReport> {
        if !self.is_online().await {
            warn!("force sync requested while offline");
            return Err(SyncError::Offline);
        }

        let remote = self.inner.remote.get_snapshot().await?;
        let local = self.inner.local.load_snapshot()?;

        let (merged, merge) = merge_snapshots_with_report(&remote, &local);
        debug!(?merge, "force sync merge");

        let now = Utc::now();
        let (snapshot, repair) = validate_and_repair(&merged, now);
        if !repair.is_clean() {
            info!(?repair, "repaired merged snapshot");
        }

        self.inner.local.save_snapshot(&snapshot)?;
        self.inner.remote.save_snapshot(&snapshot).await?;
        self.mark_synced(&CollectionKind::ALL, now).await;

        info!(
            decks = snapshot.decks.len(),
            cards = snapshot.cards.len(),
            progress = snapshot.progress.len(),
            "force sync complete"
        );

        Ok(SyncReport {
            snapshot,
            merge,
            repair,
            synced_at: now,
        })
    }

    /// Score a review, reschedule the card, and persist card and progress.
    pub async fn review_card(&self, card_id: &str, outcome: ReviewOutcome) -> Result<ReviewResult> {
        let loaded = self.load().await?;
        let mut snapshot = loaded.snapshot.clone();
        let now = Utc::now();

        let card = snapshot
            .cards
            .iter_mut()
            .find(|c| c.id == card_id)
            .ok_or_else(|| ValidationError::CardNotFound(card_id.to_string()))?;

        let quality = outcome.quality();
        let prior = self.scheduler.state_from_progress(snapshot.progress.get(card_id));
        let update = self.scheduler.update_progress(&prior, quality, now);

        card.apply_schedule(&update, now);
        let card = card.clone();

        let progress = snapshot.progress.entry(card_id.to_string()).or_default();
        progress.record_review(quality, outcome.rating(), &update, now);
        let progress = progress.clone();

        debug!(
            card_id,
            quality,
            interval = update.interval,
            repetitions = update.repetitions,
            "card reviewed"
        );

        let writes = self
            .commit(
                &loaded,
                snapshot,
                &[CollectionKind::Cards, CollectionKind::Progress],
            )
            .await?;

        Ok(ReviewResult {
            card,
            progress,
            quality,
            writes,
        })
    }

    pub async fn create_deck(
        &self,
        name: &str,
        color: &str,
        icon: &str,
        description: Option<String>,
    ) -> Result<Applied<Deck>> {
        let loaded = self.load().await?;
        let mut snapshot = loaded.snapshot.clone();

        let mut deck = Deck::new(name.trim(), color, icon, Utc::now());
        deck.description = description;
        collection::add_deck(&mut snapshot, deck.clone())?;

        let writes = self
            .commit(&loaded, snapshot, &[CollectionKind::Decks])
            .await?;
        Ok(Applied {
            value: deck,
            writes,
        })
    }

    pub async fn update_deck(&self, deck_id: &str, update: DeckUpdate) -> Result<Applied<Deck>> {
        let loaded = self.load().await?;
        let mut snapshot = loaded.snapshot.clone();

        let deck = collection::update_deck(&mut snapshot, deck_id, update, Utc::now())?;

        let writes = self
            .commit(
                &loaded,
                snapshot,
                &[CollectionKind::Decks, CollectionKind::Cards],
            )
            .await?;
        Ok(Applied {
            value: deck,
            writes,
        })
    }

    /// Delete a deck and its cards. Returns the removed card ids.
    pub async fn delete_deck(&self, deck_id: &str) -> Result<Applied<Vec<String>>> {
        let loaded = self.load().await?;
        let mut snapshot = loaded.snapshot.clone();

        let removed = collection::delete_deck(&mut snapshot, deck_id)?;
        info!(deck_id, cards = removed.len(), "deck deleted");

        let writes = self
            .commit(
                &loaded,
                snapshot,
                &[CollectionKind::Decks, CollectionKind::Cards],
            )
            .await?;
        Ok(Applied {
            value: removed,
            writes,
        })
    }

    pub async fn add_card(&self, card: Card) -> Result<Applied<Card>> {
        let loaded = self.load().await?;
        let mut snapshot = loaded.snapshot.clone();

        let id = card.id.clone();
        collection::add_card(&mut snapshot, card)?;
        let stored = snapshot
            .card(&id)
            .cloned()
            .ok_or(ValidationError::CardNotFound(id))?;

        let writes = self
            .commit(&loaded, snapshot, &[CollectionKind::Cards])
            .await?;
        Ok(Applied {
            value: stored,
            writes,
        })
    }

    pub async fn update_card(&self, card: Card) -> Result<Applied<Card>> {
        let loaded = self.load().await?;
        let mut snapshot = loaded.snapshot.clone();

        let stored = collection::update_card(&mut snapshot, card, Utc::now())?;

        let writes = self
            .commit(&loaded, snapshot, &[CollectionKind::Cards])
            .await?;
        Ok(Applied {
            value: stored,
            writes,
        })
    }

    pub async fn delete_card(&self, card_id: &str) -> Result<Applied<Card>> {
        let loaded = self.load().await?;
        let mut snapshot = loaded.snapshot.clone();

        let removed = collection::delete_card(&mut snapshot, card_id)?;

        let writes = self
            .commit(&loaded, snapshot, &[CollectionKind::Cards])
            .await?;
        Ok(Applied {
            value: removed,
            writes,
        })
    }

    /// Reinitialize every progress record and card schedule.
    pub async fn reset_progress(&self) -> Result<Applied<usize>> {
        let loaded = self.load().await?;
        let mut snapshot = loaded.snapshot.clone();

        collection::reset_progress(&mut snapshot, Utc::now());
        let count = snapshot.progress.len();
        info!(records = count, "progress reset");

        let writes = self
            .commit(
                &loaded,
                snapshot,
                &[CollectionKind::Cards, CollectionKind::Progress],
            )
            .await?;
        Ok(Applied {
            value: count,
            writes,
        })
    }

    /// Replace everything with a single default deck, on both sides.
    pub async fn clear_all_data(&self) -> Result<Applied<Snapshot>> {
        let snapshot = collection::clear_all(Utc::now());
        info!("clearing all data");

        let writes = self
            .write_collections(
                CollectionKind::ALL
                    .iter()
                    .map(|&kind| snapshot.collection(kind))
                    .collect(),
            )
            .await?;
        Ok(Applied {
            value: snapshot,
            writes,
        })
    }

    /// Run integrity repair over the current snapshot and persist the fixes.
    pub async fn repair(&self) -> Result<Applied<RepairReport>> {
        let loaded = self.load().await?;
        let (snapshot, report) = validate_and_repair(&loaded.snapshot, Utc::now());

        let changed: &[CollectionKind] = if report.is_clean() {
            &[]
        } else {
            info!(?report, "repair applied");
            &CollectionKind::ALL
        };
        let writes = self.commit(&loaded, snapshot, changed).await?;
        Ok(Applied {
            value: report,
            writes,
        })
    }

    // === Private methods ===

    /// Read local, and the remote when reachable, and reconcile them.
    async fn load(&self) -> Result<Loaded> {
        let local = self.inner.local.load_snapshot()?;

        if !self.is_online().await {
            debug!("remote offline, using local snapshot");
            return Ok(Loaded::local_only(local));
        }

        let remote = match self.inner.remote.get_snapshot().await {
            Ok(remote) => remote,
            Err(e) => {
                warn!(error = %e, "remote read failed, falling back to local snapshot");
                return Ok(Loaded::local_only(local));
            }
        };

        let reconciled = reconcile(&remote, &local);
        debug!(source = ?reconciled.source, report = ?reconciled.report, "reconciled");

        let (snapshot, repaired) = if reconciled.source == MergeSource::Merged {
            let (snapshot, report) = validate_and_repair(&reconciled.snapshot, Utc::now());
            let repaired = !report.is_clean();
            if repaired {
                info!(?report, "repaired merged snapshot");
            }
            (snapshot, repaired)
        } else {
            (reconciled.snapshot, false)
        };

        Ok(Loaded {
            snapshot,
            source: Some(reconciled.source),
            remote_has_data: !remote.is_empty(),
            repaired,
        })
    }

    /// Write `kinds` of a freshly loaded snapshot back to both stores, and
    /// record the sync state the read established.
    async fn write_back(&self, loaded: &Loaded, kinds: &[CollectionKind]) -> Result<()> {
        let Some(source) = loaded.source else {
            return Ok(());
        };

        if source != MergeSource::Local {
            let collections: Vec<Collection> =
                kinds.iter().map(|&k| loaded.snapshot.collection(k)).collect();
            self.inner.local.save_many(&collections)?;
        }
        for &kind in kinds {
            if source != MergeSource::Remote {
                let collection = loaded.snapshot.collection(kind);
                if let Err(e) = self.inner.remote.save_collection(&collection).await {
                    warn!(%kind, error = %e, "remote write-back failed");
                }
            }
        }

        if loaded.remote_has_data {
            self.mark_synced(kinds, Utc::now()).await;
        }
        Ok(())
    }

    /// Persist an edited snapshot: the changed kinds, plus every kind the
    /// load pulled in from the remote.
    async fn commit(
        &self,
        loaded: &Loaded,
        snapshot: Snapshot,
        changed: &[CollectionKind],
    ) -> Result<Vec<WriteReport>> {
        let mut kinds: Vec<CollectionKind> = changed.to_vec();
        for &kind in loaded.stale_kinds() {
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        kinds.sort();

        let reports = self
            .write_collections(kinds.iter().map(|&k| snapshot.collection(k)).collect())
            .await?;

        if loaded.remote_has_data {
            let synced: Vec<CollectionKind> = reports
                .iter()
                .filter(|r| r.remote == RemoteWrite::Saved)
                .map(|r| r.kind)
                .collect();
            self.mark_synced(&synced, Utc::now()).await;
        }
        Ok(reports)
    }

    /// Local first, all of it in one atomic save; then one probe and the
    /// remote writes.
    async fn write_collections(&self, collections: Vec<Collection>) -> Result<Vec<WriteReport>> {
        self.inner.local.save_many(&collections)?;

        let online = !collections.is_empty() && self.is_online().await;
        let mut reports = Vec::with_capacity(collections.len());

        for collection in &collections {
            let remote = if online {
                self.remote_save(collection).await
            } else {
                RemoteWrite::Skipped
            };
            reports.push(WriteReport {
                kind: collection.kind(),
                remote,
            });
        }

        Ok(reports)
    }

    async fn remote_save(&self, collection: &Collection) -> RemoteWrite {
        match self.inner.remote.save_collection(collection).await {
            Ok(()) => RemoteWrite::Saved,
            Err(e) => {
                warn!(kind = %collection.kind(), error = %e, "remote write failed, local copy kept");
                RemoteWrite::Failed(e.to_string())
            }
        }
    }

    async fn mark_synced(&self, kinds: &[CollectionKind], at: DateTime<Utc>) {
        if kinds.is_empty() {
            return;
        }
        let mut states = self.inner.sync_states.lock().await;
        for &kind in kinds {
            states.insert(kind, at);
        }
    }
}
