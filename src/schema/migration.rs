//! Migration descriptions and their lifecycle state.

use super::ddl::{todos_table, SqlType, TableDef};

/// A column added by an additive migration
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub name: String,
    pub sql_type: SqlType,
    /// Constant default for rows inserted later
    pub default: Option<String>,
    /// SQL expression over existing columns, evaluated once per existing row
    pub backfill: Option<String>,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            sql_type,
            default: None,
            backfill: None,
        }
    }

    pub fn default(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn backfill(mut self, expr: impl Into<String>) -> Self {
        self.backfill = Some(expr.into());
        self
    }

    /// Clause for `ALTER TABLE ... ADD COLUMN`
    pub fn to_sql(&self) -> String {
        let mut sql = format!("{} {}", self.name, self.sql_type.to_sqlite());
        if let Some(ref default) = self.default {
            sql.push_str(&format!(" DEFAULT {}", default));
        }
        sql
    }
}

/// How each column of a rebuilt table is derived from the original row.
///
/// Each entry pairs a target column with a SQL expression over the original
/// table's columns. The copy runs entirely inside the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnMapping {
    entries: Vec<(String, String)>,
}

impl ColumnMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy `columns` unchanged
    pub fn identity(columns: &[&str]) -> Self {
        columns
            .iter()
            .fold(Self::new(), |mapping, col| mapping.copy(col))
    }

    /// Copy a column with the same name
    pub fn copy(self, column: &str) -> Self {
        self.map(column, column)
    }

    /// Derive `target` from `expr`
    pub fn map(mut self, target: impl Into<String>, expr: impl Into<String>) -> Self {
        self.entries.push((target.into(), expr.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(target, _)| target.as_str())
    }

    /// `INSERT INTO target SELECT ... FROM source` for this mapping
    pub fn copy_sql(&self, source: &str, target: &str) -> String {
        let columns: Vec<&str> = self.entries.iter().map(|(t, _)| t.as_str()).collect();
        let exprs: Vec<&str> = self.entries.iter().map(|(_, e)| e.as_str()).collect();
        format!(
            "INSERT INTO {} ({}) SELECT {} FROM {}",
            target,
            columns.join(", "),
            exprs.join(", "),
            source
        )
    }
}

/// What a migration does
#[derive(Debug, Clone, PartialEq)]
pub enum MigrationStep {
    /// Add a nullable column, optionally backfilled
    AddColumn { table: String, column: ColumnSpec },
    /// Replace a table via shadow table, copy, drop, rename
    Rebuild {
        table: String,
        schema: TableDef,
        mapping: ColumnMapping,
    },
}

/// Lifecycle of one migration.
///
/// `Applying` is only visible while the migration's transaction is open;
/// `Failed` means it was rolled back and the schema is as before.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationState {
    Pending,
    Applying,
    Applied,
    Failed,
}

impl std::fmt::Display for MigrationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MigrationState::Pending => write!(f, "pending"),
            MigrationState::Applying => write!(f, "applying"),
            MigrationState::Applied => write!(f, "applied"),
            MigrationState::Failed => write!(f, "failed"),
        }
    }
}

/// A named migration and where it is in its lifecycle
#[derive(Debug, Clone)]
pub struct Migration {
    pub name: String,
    pub step: MigrationStep,
    pub(crate) state: MigrationState,
}

impl Migration {
    pub fn new(name: impl Into<String>, step: MigrationStep) -> Self {
        Self {
            name: name.into(),
            step,
            state: MigrationState::Pending,
        }
    }

    pub fn add_column(name: impl Into<String>, table: &str, column: ColumnSpec) -> Self {
        Self::new(
            name,
            MigrationStep::AddColumn {
                table: table.to_string(),
                column,
            },
        )
    }

    pub fn rebuild(
        name: impl Into<String>,
        table: &str,
        schema: TableDef,
        mapping: ColumnMapping,
    ) -> Self {
        Self::new(
            name,
            MigrationStep::Rebuild {
                table: table.to_string(),
                schema,
                mapping,
            },
        )
    }

    pub fn state(&self) -> MigrationState {
        self.state
    }
}

/// `todos.due_date`, backfilled to one week after creation
pub fn add_todos_due_date() -> Migration {
    Migration::add_column(
        "add_todos_due_date",
        "todos",
        ColumnSpec::new("due_date", SqlType::Timestamp)
            .default("NULL")
            .backfill("datetime(created_at, '+7 days')"),
    )
}

/// Replace `todos.is_completed` with the CHECK-constrained `status` column
pub fn rebuild_todos_status() -> Migration {
    let mapping = ColumnMapping::new()
        .copy("id")
        .copy("title")
        .map(
            "status",
            "CASE WHEN is_completed = 0 THEN 'pending' ELSE 'completed' END",
        )
        .copy("created_at")
        .copy("due_date")
        .copy("user_id");
    Migration::rebuild("rebuild_todos_status", "todos", todos_table(), mapping)
}

/// Nullable free-text `todos.description`
pub fn add_todos_description() -> Migration {
    Migration::add_column(
        "add_todos_description",
        "todos",
        ColumnSpec::new("description", SqlType::Text).default("NULL"),
    )
}

/// Migrations applied after `initialize`, in order
pub fn standard_migrations() -> Vec<Migration> {
    vec![add_todos_due_date(), rebuild_todos_status()]
}
