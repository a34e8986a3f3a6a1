//! Schema creation and in-place migration.
//!
//! Two kinds of migration are supported:
//!
//! - **Additive**: `ALTER TABLE ... ADD COLUMN` plus an optional backfill
//!   `UPDATE`, in one transaction.
//! - **Rebuild**: when a column's type or constraints cannot be altered in
//!   place, a shadow table with the new shape is created, every row is copied
//!   through a [`ColumnMapping`], the original is dropped and the shadow is
//!   renamed over it. Also one transaction.
//!
//! In both cases a failure rolls back to the previous schema; no partially
//! applied migration is ever visible.

mod ddl;
mod migration;

pub use ddl::{
    todos_baseline_table, todos_table, users_table, ColumnDef, FkAction, ForeignKeyDef, IndexDef,
    SqlType, TableDef,
};
pub use migration::{
    add_todos_description, add_todos_due_date, rebuild_todos_status, standard_migrations,
    ColumnMapping, ColumnSpec, Migration, MigrationState, MigrationStep,
};

use crate::error::{Result, SeedError};
use rusqlite::{params, Connection, TransactionBehavior};
use tracing::{info, warn};

/// Suffix for the temporary table used by rebuild migrations
const SHADOW_SUFFIX: &str = "_shadow";

/// Creates tables and applies migrations
pub struct SchemaManager;

impl SchemaManager {
    /// Drop and recreate `users` and `todos` with their baseline shape.
    ///
    /// Existing data is discarded.
    pub fn initialize(conn: &mut Connection) -> Result<()> {
        let users = users_table();
        let todos = todos_baseline_table();

        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        // Child first so the parent drop never cascades
        tx.execute_batch(&format!("DROP TABLE IF EXISTS todos{}", SHADOW_SUFFIX))?;
        tx.execute_batch(&todos.drop_sql())?;
        tx.execute_batch(&users.drop_sql())?;
        tx.execute_batch(&users.create_sql(&users.name))?;
        tx.execute_batch(&todos.create_sql(&todos.name))?;
        for stmt in todos.index_sql() {
            tx.execute_batch(&stmt)?;
        }
        tx.commit()?;

        info!("initialized users and todos tables");
        Ok(())
    }

    /// Run `migration`, moving it through its lifecycle states.
    ///
    /// Only `Pending` or `Failed` migrations may be applied.
    pub fn apply(conn: &mut Connection, migration: &mut Migration) -> Result<()> {
        if migration.state == MigrationState::Applied || migration.state == MigrationState::Applying
        {
            return Err(SeedError::migration(
                &migration.name,
                format!("cannot apply a migration in state {}", migration.state),
            ));
        }

        migration.state = MigrationState::Applying;
        info!(migration = %migration.name, state = %migration.state, "migration started");

        let result = match &migration.step {
            MigrationStep::AddColumn { table, column } => {
                Self::add_column(conn, table, column).map(|_| ())
            }
            MigrationStep::Rebuild {
                table,
                schema,
                mapping,
            } => Self::rebuild_column(conn, table, schema, mapping).map(|_| ()),
        };

        match result {
            Ok(()) => {
                migration.state = MigrationState::Applied;
                info!(migration = %migration.name, state = %migration.state, "migration finished");
                Ok(())
            }
            Err(e) => {
                migration.state = MigrationState::Failed;
                warn!(migration = %migration.name, state = %migration.state, error = %e, "migration rolled back");
                Err(e.into_migration(&migration.name))
            }
        }
    }

    /// Apply each migration in order, stopping at the first failure
    pub fn apply_all(conn: &mut Connection, migrations: &mut [Migration]) -> Result<()> {
        for migration in migrations.iter_mut() {
            Self::apply(conn, migration)?;
        }
        Ok(())
    }

    /// Add a nullable column and backfill it for existing rows.
    ///
    /// Returns the number of rows backfilled.
    pub fn add_column(conn: &mut Connection, table: &str, column: &ColumnSpec) -> Result<usize> {
        let label = format!("add_column {}.{}", table, column.name);
        validate_identifier(table)?;
        validate_identifier(&column.name)?;

        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if !table_exists(&tx, table)? {
            return Err(SeedError::migration(
                &label,
                format!("table {} does not exist", table),
            ));
        }
        if column_names(&tx, table)?.iter().any(|c| c == &column.name) {
            return Err(SeedError::migration(
                &label,
                format!("column {}.{} already exists", table, column.name),
            ));
        }

        tx.execute_batch(&format!(
            "ALTER TABLE {} ADD COLUMN {}",
            table,
            column.to_sql()
        ))?;
        let backfilled = match column.backfill {
            Some(ref expr) => tx.execute(
                &format!("UPDATE {} SET {} = {}", table, column.name, expr),
                [],
            )?,
            None => 0,
        };
        tx.commit()?;

        info!(table, column = %column.name, backfilled, "column added");
        Ok(backfilled)
    }

    /// Replace `table` with a table shaped like `schema`, deriving each row
    /// through `mapping`.
    ///
    /// Foreign-key enforcement is switched off for the duration (SQLite
    /// cannot change it inside a transaction) and restored afterwards, even
    /// on failure. The copied data must still pass `foreign_key_check`
    /// before the transaction commits. Returns the number of rows copied.
    pub fn rebuild_column(
        conn: &mut Connection,
        table: &str,
        schema: &TableDef,
        mapping: &ColumnMapping,
    ) -> Result<usize> {
        let label = format!("rebuild {}", table);
        validate_identifier(table)?;
        if mapping.is_empty() {
            return Err(SeedError::Validation(
                "rebuild mapping must name at least one column".into(),
            ));
        }
        for target in mapping.targets() {
            if !schema.has_column(target) {
                return Err(SeedError::migration(
                    &label,
                    format!("mapping targets unknown column {}", target),
                ));
            }
        }

        let fk_enabled: bool = conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))?;
        if fk_enabled {
            conn.pragma_update(None, "foreign_keys", "OFF")?;
        }
        let result = rebuild_in_transaction(conn, &label, table, schema, mapping);
        let restored = if fk_enabled {
            conn.pragma_update(None, "foreign_keys", "ON")
        } else {
            Ok(())
        };

        let copied = rebuild_outcome(table, result, restored)?;
        info!(table, rows = copied, "table rebuilt");
        Ok(copied)
    }
}

/// The rebuild error wins over a failure to restore foreign key enforcement
fn rebuild_outcome(
    table: &str,
    result: Result<usize>,
    restored: rusqlite::Result<()>,
) -> Result<usize> {
    match (result, restored) {
        (Err(e), Err(restore)) => {
            warn!(table, error = %restore, "could not re-enable foreign keys");
            Err(e)
        }
        (result, restored) => {
            let copied = result?;
            restored?;
            Ok(copied)
        }
    }
}

fn rebuild_in_transaction(
    conn: &mut Connection,
    label: &str,
    table: &str,
    schema: &TableDef,
    mapping: &ColumnMapping,
) -> Result<usize> {
    let shadow = format!("{}{}", table, SHADOW_SUFFIX);
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    if !table_exists(&tx, table)? {
        return Err(SeedError::migration(
            label,
            format!("table {} does not exist", table),
        ));
    }
    let expected: i64 = tx.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
        row.get(0)
    })?;

    tx.execute_batch(&format!("DROP TABLE IF EXISTS {}", shadow))?;
    tx.execute_batch(&schema.create_sql(&shadow))?;
    let copied = tx.execute(&mapping.copy_sql(table, &shadow), [])?;
    if copied as i64 != expected {
        return Err(SeedError::migration(
            label,
            format!("copied {} of {} rows", copied, expected),
        ));
    }

    tx.execute_batch(&format!("DROP TABLE {}", table))?;
    tx.execute_batch(&format!("ALTER TABLE {} RENAME TO {}", shadow, table))?;

    let renamed = TableDef {
        name: table.to_string(),
        ..schema.clone()
    };
    for stmt in renamed.index_sql() {
        tx.execute_batch(&stmt)?;
    }

    // Whole database: a rebuilt parent can orphan rows in other tables
    let violations: i64 =
        tx.query_row("SELECT COUNT(*) FROM pragma_foreign_key_check", [], |row| {
            row.get(0)
        })?;
    if violations > 0 {
        return Err(SeedError::migration(
            label,
            format!("{} rows violate foreign keys after copy", violations),
        ));
    }

    tx.commit()?;
    Ok(copied)
}

/// Whether `table` exists
pub fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
        params![table],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Column names of `table`, in declaration order
pub fn column_names(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")?;
    let names = stmt
        .query_map(params![table], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(names)
}

/// Table and column names are spliced into DDL, so only plain identifiers
/// are accepted.
fn validate_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(SeedError::Validation(format!(
            "invalid identifier: {:?}",
            name
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("todos").is_ok());
        assert!(validate_identifier("_due_date2").is_ok());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("2fast").is_err());
        assert!(validate_identifier("todos; DROP TABLE users").is_err());
    }

    #[test]
    fn test_initialize_creates_baseline() {
        let mut conn = Connection::open_in_memory().unwrap();
        SchemaManager::initialize(&mut conn).unwrap();
        assert!(table_exists(&conn, "users").unwrap());
        assert_eq!(
            column_names(&conn, "todos").unwrap(),
            vec!["id", "title", "is_completed", "created_at", "user_id"]
        );
    }

    #[test]
    fn test_apply_rejects_applied_migration() {
        let mut conn = Connection::open_in_memory().unwrap();
        SchemaManager::initialize(&mut conn).unwrap();
        let mut migration = add_todos_due_date();
        SchemaManager::apply(&mut conn, &mut migration).unwrap();
        assert_eq!(migration.state(), MigrationState::Applied);

        let err = SchemaManager::apply(&mut conn, &mut migration).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Migration);
        assert_eq!(migration.state(), MigrationState::Applied);
    }

    #[test]
    fn test_rebuild_error_survives_failed_fk_restore() {
        let failed = Err(SeedError::migration("rebuild todos", "copy failed"));
        let err =
            rebuild_outcome("todos", failed, Err(rusqlite::Error::InvalidQuery)).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Migration);
        assert!(err.to_string().contains("copy failed"));

        assert_eq!(rebuild_outcome("todos", Ok(3), Ok(())).unwrap(), 3);
        assert!(rebuild_outcome("todos", Ok(3), Err(rusqlite::Error::InvalidQuery)).is_err());
    }
}
