//! YAML configuration for seeding runs.
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! configuration. CLI flags override what is loaded here.

use crate::error::{Result, SeedError};
use crate::model::TodoStatus;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Default rows per insert transaction
pub const DEFAULT_BATCH_SIZE: usize = 2_500;
/// Default busy timeout (ms)
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// SQLite journal mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalMode {
    #[default]
    Wal,
    Delete,
    Memory,
}

impl JournalMode {
    pub fn pragma_value(self) -> &'static str {
        match self {
            JournalMode::Wal => "wal",
            JournalMode::Delete => "delete",
            JournalMode::Memory => "memory",
        }
    }
}

/// SQLite synchronous mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    Full,
    #[default]
    Normal,
    Off,
}

impl SyncMode {
    pub fn pragma_value(self) -> &'static str {
        match self {
            SyncMode::Full => "full",
            SyncMode::Normal => "normal",
            SyncMode::Off => "off",
        }
    }
}

/// Store connection settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path to the SQLite database file
    pub path: PathBuf,
    pub journal_mode: JournalMode,
    pub synchronous: SyncMode,
    /// Busy timeout in milliseconds
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("seed.db"),
            journal_mode: JournalMode::default(),
            synchronous: SyncMode::default(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

/// Sampled status-update settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpdateConfig {
    /// Number of sample-then-update rounds
    pub rounds: usize,
    /// Ids sampled per round
    pub sample_size: usize,
    /// Status written to sampled todos
    pub status: String,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            rounds: 10,
            sample_size: 1_000,
            status: TodoStatus::Completed.as_str().to_string(),
        }
    }
}

/// A complete seeding run
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    pub store: StoreConfig,
    /// Users to generate
    pub users: u64,
    /// Todos generated per user
    pub todos_per_user: u64,
    /// Rows per insert transaction
    pub batch_size: usize,
    /// RNG seed for record generation and sampling
    pub seed: u64,
    pub update: UpdateConfig,
    /// Also apply the nullable todos.description migration
    pub add_description: bool,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            users: 10_000,
            todos_per_user: 10,
            batch_size: DEFAULT_BATCH_SIZE,
            seed: 12345,
            update: UpdateConfig::default(),
            add_description: false,
        }
    }
}

impl SeedConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml_ng::from_str(content)
            .map_err(|e| SeedError::Config(format!("invalid seed config: {}", e)))
    }

    /// Reject settings that cannot produce a run
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(SeedError::Config("batch_size must be at least 1".into()));
        }
        if self.users == 0 && self.todos_per_user > 0 {
            return Err(SeedError::Config(
                "todos_per_user requires at least one user".into(),
            ));
        }
        if self.update.rounds > 0 && self.update.sample_size == 0 {
            return Err(SeedError::Config(
                "update.sample_size must be at least 1 when update.rounds > 0".into(),
            ));
        }
        self.update
            .status
            .parse::<TodoStatus>()
            .map_err(|e| SeedError::Config(e.to_string()))?;
        Ok(())
    }

    /// Total todos this run will insert
    pub fn total_todos(&self) -> u64 {
        self.users.saturating_mul(self.todos_per_user)
    }
}
