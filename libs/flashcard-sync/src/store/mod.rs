//! Storage collaborators: the always-available local store and the remote
//! store that may be offline.

pub mod http;
pub mod memory;
pub mod schema;
pub mod sqlite;

pub use http::HttpRemoteStore;
pub use memory::{MemoryLocalStore, MemoryRemoteStore};
pub use sqlite::SqliteLocalStore;

use crate::error::{StorageError, SyncError};
use async_trait::async_trait;
use flashcard_core::types::{Card, Collection, CollectionKind, Deck, ProgressMap, Snapshot};
use std::time::Duration;

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Durable local persistence, one document per collection.
pub trait LocalStore: Send + Sync {
    fn get_decks(&self) -> StorageResult<Vec<Deck>>;
    fn save_decks(&self, decks: &[Deck]) -> StorageResult<()>;
    fn get_cards(&self) -> StorageResult<Vec<Card>>;
    fn save_cards(&self, cards: &[Card]) -> StorageResult<()>;
    fn get_progress(&self) -> StorageResult<ProgressMap>;
    fn save_progress(&self, progress: &ProgressMap) -> StorageResult<()>;

    fn load_snapshot(&self) -> StorageResult<Snapshot> {
        Ok(Snapshot {
            decks: self.get_decks()?,
            cards: self.get_cards()?,
            progress: self.get_progress()?,
        })
    }

    fn load(&self, kind: CollectionKind) -> StorageResult<Collection> {
        Ok(match kind {
            CollectionKind::Decks => Collection::Decks(self.get_decks()?),
            CollectionKind::Cards => Collection::Cards(self.get_cards()?),
            CollectionKind::Progress => Collection::Progress(self.get_progress()?),
        })
    }

    fn save(&self, collection: &Collection) -> StorageResult<()> {
        match collection {
            Collection::Decks(decks) => self.save_decks(decks),
            Collection::Cards(cards) => self.save_cards(cards),
            Collection::Progress(progress) => self.save_progress(progress),
        }
    }

    /// Save several collections as one unit. Either all of them are stored
    /// or none is. The provided version saves them one by one, so stores that
    /// can fail part-way must override it.
    fn save_many(&self, collections: &[Collection]) -> StorageResult<()> {
        for collection in collections {
            self.save(collection)?;
        }
        Ok(())
    }

    fn save_snapshot(&self, snapshot: &Snapshot) -> StorageResult<()> {
        let collections: Vec<Collection> = CollectionKind::ALL
            .iter()
            .map(|&kind| snapshot.collection(kind))
            .collect();
        self.save_many(&collections)
    }
}

/// Remote copy of the account's collections.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn get_snapshot(&self) -> Result<Snapshot, SyncError>;
    async fn save_snapshot(&self, snapshot: &Snapshot) -> Result<(), SyncError>;
    async fn save_collection(&self, collection: &Collection) -> Result<(), SyncError>;

    /// Reachability check bounded by `timeout`. Never errors.
    async fn probe_connectivity(&self, timeout: Duration) -> bool;
}
