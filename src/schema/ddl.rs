//! Table definitions rendered to SQLite DDL.
//!
//! Definitions are built with a small builder API and rendered under any
//! table name, which is how rebuild migrations create their shadow tables.

/// Column storage types used by this schema
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SqlType {
    /// `INTEGER PRIMARY KEY AUTOINCREMENT`
    Serial,
    Integer,
    Text,
    /// Stored as SQLite text timestamp (`YYYY-MM-DD HH:MM:SS`)
    Timestamp,
}

impl SqlType {
    pub fn to_sqlite(&self) -> &'static str {
        match self {
            SqlType::Serial => "INTEGER PRIMARY KEY AUTOINCREMENT",
            SqlType::Integer => "INTEGER",
            SqlType::Text => "TEXT",
            SqlType::Timestamp => "TIMESTAMP",
        }
    }
}

/// Foreign key reference action
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum FkAction {
    #[default]
    NoAction,
    Cascade,
    SetNull,
    Restrict,
}

impl FkAction {
    pub fn to_sql(&self) -> &'static str {
        match self {
            FkAction::NoAction => "NO ACTION",
            FkAction::Cascade => "CASCADE",
            FkAction::SetNull => "SET NULL",
            FkAction::Restrict => "RESTRICT",
        }
    }
}

/// Foreign key constraint on a single column
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKeyDef {
    pub to_table: String,
    pub to_column: String,
    pub on_update: FkAction,
    pub on_delete: FkAction,
}

/// Column definition
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub sql_type: SqlType,
    pub not_null: bool,
    pub unique: bool,
    /// Raw SQL default expression
    pub default: Option<String>,
    /// Raw SQL CHECK expression
    pub check: Option<String>,
    pub foreign_key: Option<ForeignKeyDef>,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            sql_type,
            not_null: false,
            unique: false,
            default: None,
            check: None,
            foreign_key: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn default(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn check(mut self, expr: impl Into<String>) -> Self {
        self.check = Some(expr.into());
        self
    }

    pub fn references(
        mut self,
        table: impl Into<String>,
        column: impl Into<String>,
        on_update: FkAction,
        on_delete: FkAction,
    ) -> Self {
        self.foreign_key = Some(ForeignKeyDef {
            to_table: table.into(),
            to_column: column.into(),
            on_update,
            on_delete,
        });
        self
    }

    /// Column definition clause, without any table-level constraint
    pub fn to_sql(&self) -> String {
        let mut sql = format!("{} {}", self.name, self.sql_type.to_sqlite());
        if self.not_null {
            sql.push_str(" NOT NULL");
        }
        if self.unique {
            sql.push_str(" UNIQUE");
        }
        if let Some(ref default) = self.default {
            sql.push_str(&format!(" DEFAULT {}", default));
        }
        if let Some(ref check) = self.check {
            sql.push_str(&format!(" CHECK ({})", check));
        }
        sql
    }
}

/// Secondary index
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDef {
    pub name: String,
    pub columns: Vec<String>,
}

/// Table definition
#[derive(Debug, Clone, PartialEq)]
pub struct TableDef {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    pub indexes: Vec<IndexDef>,
}

impl TableDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            indexes: Vec::new(),
        }
    }

    pub fn column(mut self, col: ColumnDef) -> Self {
        self.columns.push(col);
        self
    }

    pub fn index(mut self, name: impl Into<String>, columns: &[&str]) -> Self {
        self.indexes.push(IndexDef {
            name: name.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        });
        self
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// `CREATE TABLE` statement for this definition under `table_name`
    pub fn create_sql(&self, table_name: &str) -> String {
        let mut parts: Vec<String> = self.columns.iter().map(|c| c.to_sql()).collect();
        for col in &self.columns {
            if let Some(ref fk) = col.foreign_key {
                parts.push(format!(
                    "FOREIGN KEY ({}) REFERENCES {} ({}) ON UPDATE {} ON DELETE {}",
                    col.name,
                    fk.to_table,
                    fk.to_column,
                    fk.on_update.to_sql(),
                    fk.on_delete.to_sql()
                ));
            }
        }
        format!(
            "CREATE TABLE {} (\n    {}\n)",
            table_name,
            parts.join(",\n    ")
        )
    }

    /// `CREATE INDEX` statements for this definition's table name
    pub fn index_sql(&self) -> Vec<String> {
        self.indexes
            .iter()
            .map(|idx| {
                format!(
                    "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
                    idx.name,
                    self.name,
                    idx.columns.join(", ")
                )
            })
            .collect()
    }

    /// `DROP TABLE IF EXISTS` statement
    pub fn drop_sql(&self) -> String {
        format!("DROP TABLE IF EXISTS {}", self.name)
    }
}

/// `users` table
pub fn users_table() -> TableDef {
    TableDef::new("users")
        .column(ColumnDef::new("id", SqlType::Serial))
        .column(ColumnDef::new("name", SqlType::Text).not_null())
        .column(ColumnDef::new("email", SqlType::Text).not_null().unique())
        .column(
            ColumnDef::new("created_at", SqlType::Timestamp)
                .not_null()
                .default("CURRENT_TIMESTAMP"),
        )
}

fn todos_user_id() -> ColumnDef {
    ColumnDef::new("user_id", SqlType::Integer)
        .not_null()
        .references("users", "id", FkAction::Cascade, FkAction::Cascade)
}

/// `todos` as first created, with the boolean completion flag
pub fn todos_baseline_table() -> TableDef {
    TableDef::new("todos")
        .column(ColumnDef::new("id", SqlType::Serial))
        .column(ColumnDef::new("title", SqlType::Text).not_null())
        .column(
            ColumnDef::new("is_completed", SqlType::Integer)
                .not_null()
                .default("0"),
        )
        .column(
            ColumnDef::new("created_at", SqlType::Timestamp)
                .not_null()
                .default("CURRENT_TIMESTAMP"),
        )
        .column(todos_user_id())
        .index("idx_todos_user_id", &["user_id"])
}

/// `todos` after the status rebuild
pub fn todos_table() -> TableDef {
    TableDef::new("todos")
        .column(ColumnDef::new("id", SqlType::Serial))
        .column(ColumnDef::new("title", SqlType::Text).not_null())
        .column(
            ColumnDef::new("status", SqlType::Text)
                .not_null()
                .default("'pending'")
                .check("status IN ('pending', 'in_progress', 'completed')"),
        )
        .column(
            ColumnDef::new("created_at", SqlType::Timestamp)
                .not_null()
                .default("CURRENT_TIMESTAMP"),
        )
        .column(ColumnDef::new("due_date", SqlType::Timestamp).default("NULL"))
        .column(todos_user_id())
        .index("idx_todos_user_id", &["user_id"])
}
