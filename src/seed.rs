//! End-to-end seeding run.
//!
//! Stages, in order:
//! 1. recreate the baseline schema
//! 2. load users
//! 3. migrate todos (due_date, status, optionally description)
//! 4. load todos, spread round-robin over the loaded users
//! 5. sample-and-update rounds
//! 6. summarize
//!
//! A failing stage stops the run; later stages are not attempted.

use crate::config::SeedConfig;
use crate::error::{Result, SeedError};
use crate::loader::{BatchLoader, LoadStats};
use crate::model::{NewTodo, NewUser, Table, TodoStatus};
use crate::report::{Reporter, StatusCount};
use crate::sample::sample_ids_with_rng;
use crate::schema::{add_todos_description, standard_migrations, SchemaManager};
use crate::store::Store;
use crate::updater::BulkUpdater;
use chrono::NaiveDateTime;
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::SeedableRng;
use record_gen::RecordGenerator;
use rusqlite::Connection;
use serde::Serialize;
use std::time::Instant;
use tracing::{info, info_span};

/// What a seeding run produced
#[derive(Debug, Clone, Serialize)]
pub struct SeedSummary {
    pub users: i64,
    pub todos: i64,
    pub users_load: LoadStats,
    pub todos_load: LoadStats,
    /// Migrations applied, in order
    pub migrations: Vec<String>,
    pub update_rounds: usize,
    /// Rows touched across all update rounds, repeats included
    pub rows_updated: usize,
    pub status_counts: Vec<StatusCount>,
    pub overdue: usize,
    pub duration_secs: f64,
}

impl std::fmt::Display for SeedSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Users:      {}", self.users)?;
        writeln!(f, "  load:     {}", self.users_load)?;
        writeln!(f, "Todos:      {}", self.todos)?;
        writeln!(f, "  load:     {}", self.todos_load)?;
        writeln!(f, "Migrations: {}", self.migrations.join(", "))?;
        writeln!(
            f,
            "Updates:    {} rows over {} rounds",
            self.rows_updated, self.update_rounds
        )?;
        for count in &self.status_counts {
            writeln!(f, "  {:<12}{}", count.status.as_str(), count.count)?;
        }
        writeln!(f, "Overdue:    {}", self.overdue)?;
        write!(f, "Elapsed:    {:.2}s", self.duration_secs)
    }
}

/// Runs the seeding stages against one store
pub struct Seeder<'a> {
    config: &'a SeedConfig,
    progress: bool,
}

impl<'a> Seeder<'a> {
    pub fn new(config: &'a SeedConfig) -> Self {
        Self {
            config,
            progress: false,
        }
    }

    /// Show a progress bar for each load
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn run(&self, store: &mut Store) -> Result<SeedSummary> {
        self.config.validate()?;
        let config = self.config;
        let start = Instant::now();
        let conn = store.conn_mut();

        {
            let _span = info_span!("initialize").entered();
            SchemaManager::initialize(conn)?;
        }

        let mut generator = RecordGenerator::new(config.seed);
        let users_load = {
            let _span = info_span!("load_users", count = config.users).entered();
            let loader = self.loader(config.users, "users");
            let stats = loader.load(conn, generator.users(config.users).map(NewUser::from))?;
            finish(&loader);
            info!(%stats, "users loaded");
            stats
        };

        let mut migrations = standard_migrations();
        if config.add_description {
            migrations.push(add_todos_description());
        }
        {
            let _span = info_span!("migrate").entered();
            SchemaManager::apply_all(conn, &mut migrations)?;
        }

        let todos_load = {
            let total = config.total_todos();
            let _span = info_span!("load_todos", count = total).entered();
            let todos = if total == 0 {
                LoadStats::default()
            } else {
                let owners = UserRange::load(conn)?;
                let now = store_now(conn)?;
                let loader = self.loader(total, "todos");
                let records = generator
                    .todos(total, now)
                    .enumerate()
                    .map(|(i, fields)| NewTodo::from_fields(fields, owners.owner(i as u64)));
                let stats = loader.load(conn, records)?;
                finish(&loader);
                stats
            };
            info!(stats = %todos, "todos loaded");
            todos
        };

        let rows_updated = {
            let _span = info_span!("update", rounds = config.update.rounds).entered();
            run_updates(conn, config)?
        };

        let reporter = Reporter::new(conn);
        let summary = SeedSummary {
            users: reporter.count(Table::Users)?,
            todos: reporter.count(Table::Todos)?,
            users_load,
            todos_load,
            migrations: migrations.into_iter().map(|m| m.name).collect(),
            update_rounds: config.update.rounds,
            rows_updated,
            status_counts: reporter.status_counts().collect_all()?,
            overdue: reporter.overdue_todos().for_each(|_| Ok(()))?,
            duration_secs: start.elapsed().as_secs_f64(),
        };
        info!(
            users = summary.users,
            todos = summary.todos,
            elapsed = summary.duration_secs,
            "seed complete"
        );
        Ok(summary)
    }

    fn loader(&self, total: u64, label: &str) -> BatchLoader {
        let loader = BatchLoader::new(self.config.batch_size);
        if !self.progress {
            return loader;
        }
        let pb = ProgressBar::new(total);
        let style = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}) {msg}",
        )
        .map(|s| s.progress_chars("█▓▒░  "))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        pb.set_message(format!("Loading {}...", label));
        loader.with_progress(pb)
    }
}

/// Run a full seed with `config` against `store`
pub fn run(config: &SeedConfig, store: &mut Store) -> Result<SeedSummary> {
    Seeder::new(config).run(store)
}

fn finish(loader: &BatchLoader) {
    if let Some(pb) = loader.progress() {
        pb.finish_and_clear();
    }
}

/// Sample and update `config.update.rounds` times. Returns rows touched.
fn run_updates(conn: &mut Connection, config: &SeedConfig) -> Result<usize> {
    let update = &config.update;
    let status: TodoStatus = update.status.parse()?;
    // Separate stream from record generation
    let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(1));
    let mut rows_updated = 0;

    for round in 0..update.rounds {
        let (ids, next) = sample_ids_with_rng(conn, Table::Todos, update.sample_size, rng)?;
        rng = next;
        if ids.is_empty() {
            info!(round, "no todos to update");
            break;
        }
        let stats = BulkUpdater::set_status(conn, status.as_str(), &ids)?;
        rows_updated += stats.rows_changed;
        info!(round, rows = stats.rows_changed, %status, "update round");
    }
    Ok(rows_updated)
}

/// Contiguous id range of the loaded users
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct UserRange {
    first: i64,
    len: i64,
}

impl UserRange {
    fn load(conn: &Connection) -> Result<Self> {
        let (min, max, count): (Option<i64>, Option<i64>, i64) = conn.query_row(
            "SELECT MIN(id), MAX(id), COUNT(*) FROM users",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        Self::from_bounds(min, max, count)
    }

    fn from_bounds(min: Option<i64>, max: Option<i64>, count: i64) -> Result<Self> {
        match (min, max) {
            (Some(first), Some(last)) if last - first + 1 == count => Ok(Self { first, len: count }),
            (Some(first), Some(last)) => Err(SeedError::Validation(format!(
                "user ids {}..={} are not contiguous ({} users)",
                first, last, count
            ))),
            _ => Err(SeedError::Validation("no users to own todos".into())),
        }
    }

    fn owner(&self, index: u64) -> i64 {
        self.first + (index % self.len as u64) as i64
    }
}

/// Current time according to the store
fn store_now(conn: &Connection) -> Result<NaiveDateTime> {
    let now = conn.query_row("SELECT datetime('now')", [], |row| row.get(0))?;
    Ok(now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_range_round_robin() {
        let range = UserRange::from_bounds(Some(4), Some(6), 3).unwrap();
        let owners: Vec<i64> = (0..7).map(|i| range.owner(i)).collect();
        assert_eq!(owners, vec![4, 5, 6, 4, 5, 6, 4]);
    }

    #[test]
    fn test_user_range_rejects_gaps() {
        let err = UserRange::from_bounds(Some(1), Some(10), 3).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Validation);
        assert!(UserRange::from_bounds(None, None, 0).is_err());
    }

    #[test]
    fn test_summary_display() {
        let summary = SeedSummary {
            users: 3,
            todos: 6,
            users_load: LoadStats::default(),
            todos_load: LoadStats::default(),
            migrations: vec!["add_todos_due_date".into()],
            update_rounds: 1,
            rows_updated: 2,
            status_counts: vec![StatusCount {
                status: TodoStatus::Completed,
                count: 2,
            }],
            overdue: 1,
            duration_secs: 0.5,
        };
        let text = summary.to_string();
        assert!(text.contains("Users:      3"));
        assert!(text.contains("completed   2"));
        assert!(text.ends_with("Elapsed:    0.50s"));
    }
}
