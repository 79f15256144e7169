//! Local/remote synchronization for flashcard collections.
//!
//! [`SyncOrchestrator`] sits between the application and two stores: a
//! [`LocalStore`] that is always available and a [`RemoteStore`] that may be
//! offline. Reads reconcile the two with last-write-wins; writes always land
//! locally and reach the remote when it is reachable.

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod store;

pub use config::{ConfigError, SyncConfig};
pub use error::{Result, StorageError, SyncError};
pub use orchestrator::{
    Applied, RemoteWrite, ReviewResult, SyncOrchestrator, SyncReport, SyncState, WriteReport,
};
pub use store::{
    HttpRemoteStore, LocalStore, MemoryLocalStore, MemoryRemoteStore, RemoteStore,
    SqliteLocalStore,
};
