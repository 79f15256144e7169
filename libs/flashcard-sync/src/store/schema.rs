//! SQLite schema for the local store.

/// Current schema version for migrations.
pub const SCHEMA_VERSION: i32 = 1;

/// Complete schema for the local SQLite database.
pub const SCHEMA: &str = r#"
-- One JSON document per collection kind (decks, cards, progress)
CREATE TABLE IF NOT EXISTS documents (
    kind TEXT PRIMARY KEY CHECK (kind IN ('decks', 'cards', 'progress')),
    body TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
);
"#;

/// Record the schema version if not already present.
pub const INIT_SCHEMA_VERSION: &str = "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)";
