//! Error types for seeding, migration, and reporting.

use rusqlite::ErrorCode;
use thiserror::Error;

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, SeedError>;

/// Errors surfaced by the store components.
///
/// Every component rolls back its own transaction before returning one of
/// these; nothing is retried.
#[derive(Error, Debug)]
pub enum SeedError {
    /// Unique, foreign-key, NOT NULL or CHECK constraint failed
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// Schema migration could not be applied; prior schema is intact
    #[error("migration '{migration}' failed: {reason}")]
    Migration { migration: String, reason: String },

    /// Caller supplied invalid input
    #[error("validation error: {0}")]
    Validation(String),

    /// Store unreachable, locked, or not a database
    #[error("connection error: {0}")]
    Connection(String),

    /// Any other engine error
    #[error("store error: {0}")]
    Store(#[source] rusqlite::Error),

    /// Invalid seeding configuration
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A batch failed; batches before `index` are committed
    #[error("batch {index} failed after {committed_rows} committed rows: {source}")]
    Batch {
        index: usize,
        committed_rows: u64,
        #[source]
        source: Box<SeedError>,
    },
}

/// Coarse error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ConstraintViolation,
    Migration,
    Validation,
    Connection,
    Store,
    Config,
    Io,
}

impl SeedError {
    /// Classify the error, looking through batch wrappers
    pub fn kind(&self) -> ErrorKind {
        match self {
            SeedError::ConstraintViolation(_) => ErrorKind::ConstraintViolation,
            SeedError::Migration { .. } => ErrorKind::Migration,
            SeedError::Validation(_) => ErrorKind::Validation,
            SeedError::Connection(_) => ErrorKind::Connection,
            SeedError::Store(_) => ErrorKind::Store,
            SeedError::Config(_) => ErrorKind::Config,
            SeedError::Io(_) => ErrorKind::Io,
            SeedError::Batch { source, .. } => source.kind(),
        }
    }

    /// Index of the failed batch, if this error came from a batched load
    pub fn batch_index(&self) -> Option<usize> {
        match self {
            SeedError::Batch { index, .. } => Some(*index),
            _ => None,
        }
    }

    pub(crate) fn migration(migration: &str, reason: impl Into<String>) -> Self {
        SeedError::Migration {
            migration: migration.to_string(),
            reason: reason.into(),
        }
    }

    /// Re-tag any error raised while a migration was applying
    pub(crate) fn into_migration(self, migration: &str) -> Self {
        match self {
            SeedError::Migration { .. } => self,
            other => SeedError::migration(migration, other.to_string()),
        }
    }
}

impl From<rusqlite::Error> for SeedError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(ErrorCode::ConstraintViolation) => SeedError::ConstraintViolation(err.to_string()),
            Some(
                ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked
                | ErrorCode::CannotOpen
                | ErrorCode::NotADatabase,
            ) => SeedError::Connection(err.to_string()),
            _ => SeedError::Store(err),
        }
    }
}
