//! SQLite-backed local store.

use super::schema::{INIT_SCHEMA_VERSION, SCHEMA, SCHEMA_VERSION};
use super::{LocalStore, StorageResult};
use crate::error::StorageError;
use chrono::Utc;
use flashcard_core::types::{Card, Collection, CollectionKind, Deck, ProgressMap};
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Local store keeping each collection as a JSON document in SQLite.
pub struct SqliteLocalStore {
    conn: Mutex<Connection>,
}

impl SqliteLocalStore {
    /// Open database at path, creating it and its directory if necessary.
    pub fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Open in-memory database (for testing).
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StorageResult<Self> {
        conn.execute_batch(SCHEMA)?;
        conn.execute(INIT_SCHEMA_VERSION, params![SCHEMA_VERSION])?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Unavailable("connection lock poisoned".into()))
    }

    fn read_document<T>(&self, kind: CollectionKind) -> StorageResult<T>
    where
        T: DeserializeOwned + Default,
    {
        let body: Option<String> = self
            .conn()?
            .query_row(
                "SELECT body FROM documents WHERE kind = ?1",
                params![kind.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        match body {
            Some(body) => Ok(serde_json::from_str(&body)?),
            None => Ok(T::default()),
        }
    }

    fn write_document<T: Serialize + ?Sized>(
        &self,
        kind: CollectionKind,
        value: &T,
    ) -> StorageResult<()> {
        let body = serde_json::to_string(value)?;
        let conn = self.conn()?;
        put_document(&conn, kind, &body)
    }
}

fn put_document(conn: &Connection, kind: CollectionKind, body: &str) -> StorageResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO documents (kind, body, updated_at) VALUES (?1, ?2, ?3)",
        params![kind.as_str(), body, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

impl LocalStore for SqliteLocalStore {
    fn get_decks(&self) -> StorageResult<Vec<Deck>> {
        self.read_document(CollectionKind::Decks)
    }

    fn save_decks(&self, decks: &[Deck]) -> StorageResult<()> {
        self.write_document(CollectionKind::Decks, decks)
    }

    fn get_cards(&self) -> StorageResult<Vec<Card>> {
        self.read_document(CollectionKind::Cards)
    }

    fn save_cards(&self, cards: &[Card]) -> StorageResult<()> {
        self.write_document(CollectionKind::Cards, cards)
    }

    fn get_progress(&self) -> StorageResult<ProgressMap> {
        self.read_document(CollectionKind::Progress)
    }

    fn save_progress(&self, progress: &ProgressMap) -> StorageResult<()> {
        self.write_document(CollectionKind::Progress, progress)
    }

    /// All documents in one transaction.
    fn save_many(&self, collections: &[Collection]) -> StorageResult<()> {
        let bodies = collections
            .iter()
            .map(|c| -> StorageResult<(CollectionKind, String)> {
                Ok((c.kind(), serde_json::to_string(c)?))
            })
            .collect::<StorageResult<Vec<_>>>()?;

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        for (kind, body) in &bodies {
            put_document(&tx, *kind, body)?;
        }
        tx.commit()?;
        Ok(())
    }
}
