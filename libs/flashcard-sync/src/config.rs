//! Sync configuration.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const ENV_BACKEND_URL: &str = "FLASHCARDS_BACKEND_URL";
pub const ENV_ACCOUNT_ID: &str = "FLASHCARDS_ACCOUNT_ID";
pub const ENV_PROBE_TIMEOUT_MS: &str = "FLASHCARDS_PROBE_TIMEOUT_MS";
pub const ENV_DATABASE_PATH: &str = "FLASHCARDS_DATABASE_PATH";

/// Default bound on the connectivity probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(3000);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Where to sync to and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub backend_url: String,
    pub account_id: String,
    pub probe_timeout: Duration,
    pub database_path: PathBuf,
}

impl SyncConfig {
    pub fn new(backend_url: impl Into<String>, account_id: impl Into<String>) -> Self {
        Self {
            backend_url: backend_url.into().trim_end_matches('/').to_string(),
            account_id: account_id.into(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            database_path: default_database_path(),
        }
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = path.into();
        self
    }

    /// Read `FLASHCARDS_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable lookup. Backend URL and account id are required.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend_url = lookup(ENV_BACKEND_URL)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing(ENV_BACKEND_URL))?;
        let account_id = lookup(ENV_ACCOUNT_ID)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing(ENV_ACCOUNT_ID))?;

        let mut config = Self::new(backend_url, account_id);

        if let Some(raw) = lookup(ENV_PROBE_TIMEOUT_MS) {
            let millis: u64 = raw.trim().parse().map_err(|_| ConfigError::Invalid {
                name: ENV_PROBE_TIMEOUT_MS,
                value: raw.clone(),
            })?;
            config.probe_timeout = Duration::from_millis(millis);
        }
        if let Some(path) = lookup(ENV_DATABASE_PATH).filter(|v| !v.trim().is_empty()) {
            config.database_path = PathBuf::from(path);
        }

        Ok(config)
    }
}

/// `flashcards.db` under the platform's local data directory.
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("flashcards")
        .join("flashcards.db")
}
