//! Seed a SQLite store with synthetic users and todos, migrate its schema in
//! place, and report on the result.
//!
//! ```no_run
//! use todo_seeder::{seed, SeedConfig, Store};
//!
//! let config = SeedConfig::default();
//! let mut store = Store::open(&config.store)?;
//! let summary = seed::run(&config, &mut store)?;
//! println!("{}", summary);
//! # Ok::<(), todo_seeder::SeedError>(())
//! ```

pub mod config;
pub mod error;
pub mod loader;
pub mod model;
pub mod report;
pub mod sample;
pub mod schema;
pub mod seed;
pub mod store;
pub mod updater;

pub use config::SeedConfig;
pub use error::{ErrorKind, Result, SeedError};
pub use loader::{BatchLoader, LoadStats};
pub use model::{NewTodo, NewUser, Record, Table, Todo, TodoStatus, User};
pub use report::Reporter;
pub use schema::SchemaManager;
pub use seed::SeedSummary;
pub use store::Store;
pub use updater::{BulkUpdater, UpdateStats};
