//! Small maintenance commands: init, set-status, delete-user.

use super::open_existing;
use anyhow::{Context, Result};
use std::path::PathBuf;
use todo_seeder::config::StoreConfig;
use todo_seeder::schema::standard_migrations;
use todo_seeder::{BulkUpdater, SchemaManager, Store};

pub fn init(database: PathBuf) -> Result<()> {
    let mut store = Store::open(&StoreConfig {
        path: database.clone(),
        ..Default::default()
    })
    .with_context(|| format!("Cannot open database: {}", database.display()))?;
    SchemaManager::initialize(store.conn_mut())?;
    let mut migrations = standard_migrations();
    SchemaManager::apply_all(store.conn_mut(), &mut migrations)?;
    eprintln!(
        "Initialized {} ({} migrations applied)",
        database.display(),
        migrations.len()
    );
    Ok(())
}

pub fn set_status(database: PathBuf, status: String, ids: Vec<i64>) -> Result<()> {
    let mut store = open_existing(database)?;
    let stats = BulkUpdater::set_status(store.conn_mut(), &status, &ids)?;
    eprintln!(
        "Set status '{}' on {} of {} requested todos",
        status, stats.rows_changed, stats.requested
    );
    Ok(())
}

pub fn delete_user(database: PathBuf, user_id: i64) -> Result<()> {
    let mut store = open_existing(database)?;
    let deleted = BulkUpdater::delete_user(store.conn_mut(), user_id)?;
    if deleted == 0 {
        anyhow::bail!("User {} not found", user_id);
    }
    eprintln!("Deleted user {} and their todos", user_id);
    Ok(())
}
