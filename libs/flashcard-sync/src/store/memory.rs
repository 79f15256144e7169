//! In-memory stores for tests and throwaway sessions.

use super::{LocalStore, RemoteStore, StorageResult};
use crate::error::{StorageError, SyncError};
use async_trait::async_trait;
use flashcard_core::types::{Card, Collection, Deck, ProgressMap, Snapshot};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Local store held in memory. `fail_writes` simulates quota exhaustion;
/// [`fail_writes_after`](Self::fail_writes_after) makes it run out part-way.
pub struct MemoryLocalStore {
    snapshot: Mutex<Snapshot>,
    pub fail_writes: AtomicBool,
    /// Collection writes left before the store fails. `u64::MAX` is unlimited.
    write_budget: AtomicU64,
}

impl Default for MemoryLocalStore {
    fn default() -> Self {
        Self::new(Snapshot::default())
    }
}

impl MemoryLocalStore {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
            fail_writes: AtomicBool::new(false),
            write_budget: AtomicU64::new(u64::MAX),
        }
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Accept `writes` more collection writes, then fail every one after.
    pub fn fail_writes_after(&self, writes: u64) {
        self.write_budget.store(writes, Ordering::SeqCst);
    }

    /// Current contents.
    pub fn contents(&self) -> StorageResult<Snapshot> {
        Ok(self.state()?.clone())
    }

    fn spend_write(&self) -> StorageResult<()> {
        let quota = || StorageError::Unavailable("storage quota exceeded".into());
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(quota());
        }
        self.write_budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| match left {
                0 => None,
                u64::MAX => Some(u64::MAX),
                left => Some(left - 1),
            })
            .map(|_| ())
            .map_err(|_| quota())
    }

    fn state(&self) -> StorageResult<MutexGuard<'_, Snapshot>> {
        self.snapshot
            .lock()
            .map_err(|_| StorageError::Unavailable("memory store lock poisoned".into()))
    }

    fn writable(&self) -> StorageResult<MutexGuard<'_, Snapshot>> {
        self.spend_write()?;
        self.state()
    }
}

impl LocalStore for MemoryLocalStore {
    fn get_decks(&self) -> StorageResult<Vec<Deck>> {
        Ok(self.state()?.decks.clone())
    }

    fn save_decks(&self, decks: &[Deck]) -> StorageResult<()> {
        self.writable()?.decks = decks.to_vec();
        Ok(())
    }

    fn get_cards(&self) -> StorageResult<Vec<Card>> {
        Ok(self.state()?.cards.clone())
    }

    fn save_cards(&self, cards: &[Card]) -> StorageResult<()> {
        self.writable()?.cards = cards.to_vec();
        Ok(())
    }

    fn get_progress(&self) -> StorageResult<ProgressMap> {
        Ok(self.state()?.progress.clone())
    }

    fn save_progress(&self, progress: &ProgressMap) -> StorageResult<()> {
        self.writable()?.progress = progress.clone();
        Ok(())
    }

    /// Applied to a copy and swapped in only when every write succeeds.
    fn save_many(&self, collections: &[Collection]) -> StorageResult<()> {
        let mut state = self.state()?;
        let mut staged = state.clone();
        for collection in collections {
            self.spend_write()?;
            staged.set_collection(collection.clone());
        }
        *state = staged;
        Ok(())
    }
}

/// Remote store held in memory, with switches for going offline and for
/// failing writes while still answering the probe.
pub struct MemoryRemoteStore {
    snapshot: tokio::sync::Mutex<Snapshot>,
    pub online: AtomicBool,
    pub fail_writes: AtomicBool,
    pub save_calls: AtomicU64,
}

impl Default for MemoryRemoteStore {
    fn default() -> Self {
        Self::new(Snapshot::default())
    }
}

impl MemoryRemoteStore {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            snapshot: tokio::sync::Mutex::new(snapshot),
            online: AtomicBool::new(true),
            fail_writes: AtomicBool::new(false),
            save_calls: AtomicU64::new(0),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn save_calls(&self) -> u64 {
        self.save_calls.load(Ordering::SeqCst)
    }

    /// Current contents, bypassing the online switch.
    pub async fn contents(&self) -> Snapshot {
        self.snapshot.lock().await.clone()
    }

    fn reachable(&self) -> Result<(), SyncError> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(SyncError::Network("remote store offline".into()))
        }
    }

    fn accept_write(&self) -> Result<(), SyncError> {
        self.reachable()?;
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(SyncError::Backend {
                status: 503,
                message: "write rejected".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn get_snapshot(&self) -> Result<Snapshot, SyncError> {
        self.reachable()?;
        Ok(self.snapshot.lock().await.clone())
    }

    async fn save_snapshot(&self, snapshot: &Snapshot) -> Result<(), SyncError> {
        self.accept_write()?;
        *self.snapshot.lock().await = snapshot.clone();
        Ok(())
    }

    async fn save_collection(&self, collection: &Collection) -> Result<(), SyncError> {
        self.accept_write()?;
        self.snapshot.lock().await.set_collection(collection.clone());
        Ok(())
    }

    async fn probe_connectivity(&self, _timeout: Duration) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}
