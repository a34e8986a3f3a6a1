//! Data model: users, todos, and the insertable record trait.

use crate::error::SeedError;
use chrono::NaiveDateTime;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::{Row, ToSql};
use serde::Serialize;

/// Tables whose ids can be enumerated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Users,
    Todos,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::Users => "users",
            Table::Todos => "todos",
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Table {
    type Err = SeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "users" => Ok(Table::Users),
            "todos" => Ok(Table::Todos),
            _ => Err(SeedError::Validation(format!(
                "Unknown table: {}. Valid: users, todos",
                s
            ))),
        }
    }
}

/// Todo lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl TodoStatus {
    pub const ALL: [TodoStatus; 3] = [
        TodoStatus::Pending,
        TodoStatus::InProgress,
        TodoStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TodoStatus::Pending => "pending",
            TodoStatus::InProgress => "in_progress",
            TodoStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for TodoStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TodoStatus {
    type Err = SeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TodoStatus::Pending),
            "in_progress" => Ok(TodoStatus::InProgress),
            "completed" => Ok(TodoStatus::Completed),
            _ => Err(SeedError::Validation(format!(
                "Unknown status: {}. Valid: pending, in_progress, completed",
                s
            ))),
        }
    }
}

impl ToSql for TodoStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TodoStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: SeedError| FromSqlError::Other(Box::new(e)))
    }
}

/// An insertable row.
///
/// `COLUMNS` fixes the column order; `bind` must push exactly one parameter
/// per column, in that order.
pub trait Record {
    const TABLE: &'static str;
    const COLUMNS: &'static [&'static str];

    fn bind<'a>(&'a self, params: &mut Vec<&'a dyn ToSql>);
}

/// User row to insert; id and created_at are assigned by the store
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
}

impl Record for NewUser {
    const TABLE: &'static str = "users";
    const COLUMNS: &'static [&'static str] = &["name", "email"];

    fn bind<'a>(&'a self, params: &mut Vec<&'a dyn ToSql>) {
        params.push(&self.name);
        params.push(&self.email);
    }
}

impl From<record_gen::UserFields> for NewUser {
    fn from(fields: record_gen::UserFields) -> Self {
        Self {
            name: fields.name,
            email: fields.email,
        }
    }
}

/// Todo row to insert against the migrated todos table
#[derive(Debug, Clone, PartialEq)]
pub struct NewTodo {
    pub title: String,
    pub status: TodoStatus,
    pub created_at: NaiveDateTime,
    pub due_date: Option<NaiveDateTime>,
    pub user_id: i64,
}

impl NewTodo {
    pub fn from_fields(fields: record_gen::TodoFields, user_id: i64) -> Self {
        Self {
            title: fields.title,
            status: TodoStatus::Pending,
            created_at: fields.created_at,
            due_date: Some(fields.due_date),
            user_id,
        }
    }
}

impl Record for NewTodo {
    const TABLE: &'static str = "todos";
    const COLUMNS: &'static [&'static str] =
        &["title", "status", "created_at", "due_date", "user_id"];

    fn bind<'a>(&'a self, params: &mut Vec<&'a dyn ToSql>) {
        params.push(&self.title);
        params.push(&self.status);
        params.push(&self.created_at);
        params.push(&self.due_date);
        params.push(&self.user_id);
    }
}

/// Stored user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub created_at: NaiveDateTime,
}

impl User {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            email: row.get("email")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Stored todo (migrated shape)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Todo {
    pub id: i64,
    pub title: String,
    pub status: TodoStatus,
    pub created_at: NaiveDateTime,
    pub due_date: Option<NaiveDateTime>,
    pub user_id: i64,
}

impl Todo {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            title: row.get("title")?,
            status: row.get("status")?,
            created_at: row.get("created_at")?,
            due_date: row.get("due_date")?,
            user_id: row.get("user_id")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_status_round_trips_through_str() {
        for status in TodoStatus::ALL {
            assert_eq!(status.as_str().parse::<TodoStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_unknown_status_rejected() {
        let err = "done".parse::<TodoStatus>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        // Matching is exact; callers normalise case themselves
        assert!("Completed".parse::<TodoStatus>().is_err());
    }

    #[test]
    fn test_record_binds_one_param_per_column() {
        let user = NewUser {
            name: "Alice".into(),
            email: "alice@example.com".into(),
        };
        let mut params = Vec::new();
        user.bind(&mut params);
        assert_eq!(params.len(), NewUser::COLUMNS.len());

        let todo = NewTodo {
            title: "Write report".into(),
            status: TodoStatus::Pending,
            created_at: chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            due_date: None,
            user_id: 1,
        };
        let mut params = Vec::new();
        todo.bind(&mut params);
        assert_eq!(params.len(), NewTodo::COLUMNS.len());
    }

    #[test]
    fn test_table_from_str() {
        assert_eq!("Users".parse::<Table>().unwrap(), Table::Users);
        assert_eq!(
            "orders".parse::<Table>().unwrap_err().kind(),
            ErrorKind::Validation
        );
    }
}
