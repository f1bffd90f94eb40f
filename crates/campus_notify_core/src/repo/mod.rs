//! Persistence adapters for the notification snapshot.
//!
//! # Responsibility
//! - Define the storage-agnostic snapshot contract used by the engine.
//! - Provide in-memory, JSON file and SQLite implementations.
//!
//! # Invariants
//! - `save_all` replaces the whole stored set; there is no append log.
//! - `load_all` drops individually corrupt records instead of failing.
//! - A missing store loads as an empty set.

use crate::config::StorageConfig;
use crate::db::DbError;
use crate::model::notification::Notification;
use std::path::PathBuf;
use thiserror::Error;

pub mod json_file;
pub mod memory;
pub mod snapshot;
pub mod sqlite;

pub use json_file::JsonFileNotificationRepository;
pub use memory::InMemoryNotificationRepository;
pub use sqlite::SqliteNotificationRepository;

pub type RepoResult<T> = Result<T, RepoError>;

/// Unrecoverable persistence failure.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("i/o failure on `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("snapshot encoding failed: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("snapshot is not valid JSON: {0}")]
    Decode(#[source] serde_json::Error),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("snapshot schema version {found} is newer than supported {supported}")]
    UnsupportedSchemaVersion { found: u64, supported: u64 },
    #[error("invalid persisted notification data: {0}")]
    InvalidData(String),
    #[error("save skipped; stored snapshot failed to load: {0}")]
    WritesSuspended(String),
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Durable snapshot storage for the notification set.
///
/// Implementations must be usable from any thread; the engine serializes
/// calls under its own write lock.
pub trait NotificationRepository: Send + Sync {
    /// Short medium name used in log events.
    fn medium(&self) -> &'static str;

    /// Restores the stored set in storage order.
    fn load_all(&self) -> RepoResult<Vec<Notification>>;

    /// Replaces the stored set with `notifications`, keeping their order.
    fn save_all(&self, notifications: &[Notification]) -> RepoResult<()>;
}

/// Builds the repository selected by configuration.
pub fn open_repository(config: &StorageConfig) -> RepoResult<Box<dyn NotificationRepository>> {
    match config {
        StorageConfig::Memory => Ok(Box::new(InMemoryNotificationRepository::new())),
        StorageConfig::JsonFile { path } => {
            Ok(Box::new(JsonFileNotificationRepository::new(path.clone())))
        }
        StorageConfig::Sqlite { path } => Ok(Box::new(SqliteNotificationRepository::open(path)?)),
    }
}
