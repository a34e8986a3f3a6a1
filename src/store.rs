//! Caller-owned handle to the embedded SQLite store.
//!
//! The store owns exactly one connection. Components borrow it for the
//! length of a single call and never keep it.

use crate::config::StoreConfig;
use crate::error::{Result, SeedError};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

#[derive(Debug)]
pub struct Store {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Store {
    /// Open (or create) a file-backed store
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let conn = Connection::open(&config.path).map_err(|e| {
            SeedError::Connection(format!("cannot open {}: {}", config.path.display(), e))
        })?;
        apply_pragmas(&conn, config)?;
        debug!(path = %config.path.display(), "opened store");
        Ok(Self {
            conn,
            path: Some(config.path.clone()),
        })
    }

    /// Open a file-backed store at `path` with default settings
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::open(&StoreConfig {
            path: path.as_ref().to_path_buf(),
            ..Default::default()
        })
    }

    /// Open a private in-memory store
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| SeedError::Connection(format!("cannot open in-memory store: {}", e)))?;
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(connection_error)?;
        Ok(Self { conn, path: None })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Backing file, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

fn apply_pragmas(conn: &Connection, config: &StoreConfig) -> Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")
        .map_err(connection_error)?;
    // journal_mode returns the resulting mode as a row
    let _mode: String = conn
        .pragma_update_and_check(None, "journal_mode", config.journal_mode.pragma_value(), |row| {
            row.get(0)
        })
        .map_err(connection_error)?;
    conn.pragma_update(None, "synchronous", config.synchronous.pragma_value())
        .map_err(connection_error)?;
    conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .map_err(connection_error)?;
    Ok(())
}

fn connection_error(err: rusqlite::Error) -> SeedError {
    SeedError::Connection(err.to_string())
}
