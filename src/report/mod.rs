//! Read-only aggregate queries over a seeded store.
//!
//! Every query is a [`ReportQuery`]: a prepared SQL text plus its bound
//! parameters. Nothing runs until the query is consumed, and each call to
//! [`ReportQuery::for_each`] or [`ReportQuery::collect_all`] executes it
//! again from scratch, so a query value can be reused and never shares
//! cursor state with another consumer.
//!
//! Time windows are computed by the store (`datetime('now', ...)`), never
//! from the caller's clock.

mod output;

pub use output::{OutputFormat, ReportFormatter, ReportRow};

use crate::error::Result;
use crate::model::{Table, Todo, TodoStatus, User};
use chrono::NaiveDateTime;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};
use serde::Serialize;

/// Trailing window for [`Reporter::stale_todos`]
pub const STALE_WINDOW_DAYS: u32 = 7;
/// Trailing window for [`Reporter::inactive_users`]
pub const INACTIVE_WINDOW_DAYS: u32 = 30;

const TODO_COLUMNS: &str = "todos.id AS id, todos.title AS title, todos.status AS status, \
     todos.created_at AS created_at, todos.due_date AS due_date, todos.user_id AS user_id";

const COMPLETION_SELECT: &str = "SELECT users.id AS user_id, users.name AS name, \
     users.email AS email, \
     SUM(CASE WHEN todos.status = 'completed' THEN 1 ELSE 0 END) AS completed, \
     SUM(CASE WHEN todos.status = 'completed' THEN 0 ELSE 1 END) AS not_completed, \
     COUNT(*) AS total \
     FROM users INNER JOIN todos ON todos.user_id = users.id";

/// Number of todos a user owns
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TodoCount {
    pub user_id: i64,
    pub name: String,
    pub count: i64,
}

/// Completed versus outstanding todos for one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionReport {
    pub user_id: i64,
    pub name: String,
    pub email: String,
    pub completed: i64,
    pub not_completed: i64,
    pub total: i64,
}

/// A user's most recently created todo
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatestTodo {
    pub user_id: i64,
    pub name: String,
    pub title: String,
    pub created_at: NaiveDateTime,
    pub due_date: Option<NaiveDateTime>,
}

/// A user with no completions in the trailing window
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InactiveUser {
    pub user_id: i64,
    pub name: String,
    /// Todos created in the window
    pub total: i64,
    pub completed: i64,
}

/// Number of todos in one status
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: TodoStatus,
    pub count: i64,
}

impl TodoCount {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            user_id: row.get("user_id")?,
            name: row.get("name")?,
            count: row.get("count")?,
        })
    }
}

impl CompletionReport {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            user_id: row.get("user_id")?,
            name: row.get("name")?,
            email: row.get("email")?,
            completed: row.get("completed")?,
            not_completed: row.get("not_completed")?,
            total: row.get("total")?,
        })
    }
}

impl LatestTodo {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            user_id: row.get("user_id")?,
            name: row.get("name")?,
            title: row.get("title")?,
            created_at: row.get("created_at")?,
            due_date: row.get("due_date")?,
        })
    }
}

impl InactiveUser {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            user_id: row.get("user_id")?,
            name: row.get("name")?,
            total: row.get("total")?,
            completed: row.get("completed")?,
        })
    }
}

impl StatusCount {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            status: row.get("status")?,
            count: row.get("count")?,
        })
    }
}

type RowMapper<T> = fn(&Row<'_>) -> rusqlite::Result<T>;

/// A deferred, re-runnable query
pub struct ReportQuery<'conn, T> {
    conn: &'conn Connection,
    sql: String,
    params: Vec<Value>,
    limit: Option<usize>,
    map: RowMapper<T>,
}

impl<'conn, T> ReportQuery<'conn, T> {
    fn new(conn: &'conn Connection, sql: impl Into<String>, map: RowMapper<T>) -> Self {
        Self {
            conn,
            sql: sql.into(),
            params: Vec::new(),
            limit: None,
            map,
        }
    }

    fn bind(mut self, value: impl Into<Value>) -> Self {
        self.params.push(value.into());
        self
    }

    /// Stop after `limit` rows
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn sql(&self) -> String {
        match self.limit {
            Some(n) => format!("{} LIMIT {}", self.sql, n),
            None => self.sql.clone(),
        }
    }

    /// Execute the query and hand each row to `f` as it is read.
    ///
    /// Rows are never buffered. Returns the number of rows visited.
    pub fn for_each<F>(&self, mut f: F) -> Result<usize>
    where
        F: FnMut(T) -> Result<()>,
    {
        let mut stmt = self.conn.prepare_cached(&self.sql())?;
        let rows = stmt.query_map(params_from_iter(self.params.iter()), self.map)?;
        let mut visited = 0;
        for row in rows {
            f(row?)?;
            visited += 1;
        }
        Ok(visited)
    }

    /// Execute the query and collect every row
    pub fn collect_all(&self) -> Result<Vec<T>> {
        let mut out = Vec::new();
        self.for_each(|row| {
            out.push(row);
            Ok(())
        })?;
        Ok(out)
    }

    /// Execute the query and return its first row, if any
    pub fn first(&self) -> Result<Option<T>> {
        let mut stmt = self.conn.prepare_cached(&self.sql())?;
        let mut rows = stmt.query_map(params_from_iter(self.params.iter()), self.map)?;
        Ok(rows.next().transpose()?)
    }
}

/// Builds report queries against one connection
pub struct Reporter<'conn> {
    conn: &'conn Connection,
}

impl<'conn> Reporter<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Every id in `table`, ascending
    pub fn ids(&self, table: Table) -> ReportQuery<'conn, i64> {
        ReportQuery::new(
            self.conn,
            format!("SELECT id FROM {} ORDER BY id", table.name()),
            |row| row.get(0),
        )
    }

    /// Every user, by id
    pub fn users(&self) -> ReportQuery<'conn, User> {
        ReportQuery::new(
            self.conn,
            "SELECT id, name, email, created_at FROM users ORDER BY id",
            User::from_row,
        )
    }

    /// A user's todos, newest first
    pub fn todos_for_user(&self, user_id: i64) -> ReportQuery<'conn, Todo> {
        ReportQuery::new(
            self.conn,
            format!(
                "SELECT {} FROM todos WHERE todos.user_id = ?1 \
                 ORDER BY todos.created_at DESC, todos.id DESC",
                TODO_COLUMNS
            ),
            Todo::from_row,
        )
        .bind(user_id)
    }

    /// Todo count per user, for users owning at least one todo
    pub fn todo_count_by_user(&self) -> ReportQuery<'conn, TodoCount> {
        ReportQuery::new(
            self.conn,
            "SELECT users.id AS user_id, users.name AS name, COUNT(todos.id) AS count \
             FROM users INNER JOIN todos ON todos.user_id = users.id \
             GROUP BY users.id ORDER BY users.id",
            TodoCount::from_row,
        )
    }

    /// Each user's most recently created todo; ties go to the higher id
    pub fn latest_todo_by_user(&self) -> ReportQuery<'conn, LatestTodo> {
        ReportQuery::new(
            self.conn,
            "SELECT users.id AS user_id, users.name AS name, todos.title AS title, \
             todos.created_at AS created_at, todos.due_date AS due_date \
             FROM users INNER JOIN todos ON todos.user_id = users.id \
             WHERE todos.id = (SELECT latest.id FROM todos AS latest \
                 WHERE latest.user_id = users.id \
                 ORDER BY latest.created_at DESC, latest.id DESC LIMIT 1) \
             ORDER BY users.id",
            LatestTodo::from_row,
        )
    }

    /// Completed and outstanding counts for every user owning todos
    pub fn completion_report(&self) -> ReportQuery<'conn, CompletionReport> {
        ReportQuery::new(
            self.conn,
            format!("{} GROUP BY users.id ORDER BY users.id", COMPLETION_SELECT),
            CompletionReport::from_row,
        )
    }

    /// [`Reporter::completion_report`] for a single user
    pub fn completion_report_for_user(&self, user_id: i64) -> ReportQuery<'conn, CompletionReport> {
        ReportQuery::new(
            self.conn,
            format!(
                "{} WHERE users.id = ?1 GROUP BY users.id",
                COMPLETION_SELECT
            ),
            CompletionReport::from_row,
        )
        .bind(user_id)
    }

    /// Todos not completed and created within the last 7 days
    pub fn stale_todos(&self) -> ReportQuery<'conn, Todo> {
        self.stale_todos_within(STALE_WINDOW_DAYS)
    }

    pub fn stale_todos_within(&self, days: u32) -> ReportQuery<'conn, Todo> {
        ReportQuery::new(
            self.conn,
            format!(
                "SELECT {} FROM todos WHERE todos.status != 'completed' \
                 AND todos.created_at > datetime('now', ?1) \
                 ORDER BY todos.created_at DESC, todos.id DESC",
                TODO_COLUMNS
            ),
            Todo::from_row,
        )
        .bind(window(days))
    }

    /// Users with no completed todos among those created in the last 30 days,
    /// including users with no recent todos at all
    pub fn inactive_users(&self) -> ReportQuery<'conn, InactiveUser> {
        self.inactive_users_within(INACTIVE_WINDOW_DAYS)
    }

    pub fn inactive_users_within(&self, days: u32) -> ReportQuery<'conn, InactiveUser> {
        ReportQuery::new(
            self.conn,
            "SELECT users.id AS user_id, users.name AS name, COUNT(todos.id) AS total, \
             COALESCE(SUM(CASE WHEN todos.status = 'completed' THEN 1 ELSE 0 END), 0) \
             AS completed \
             FROM users LEFT JOIN todos ON todos.user_id = users.id \
             AND todos.created_at > datetime('now', ?1) \
             GROUP BY users.id HAVING completed = 0 ORDER BY users.id",
            InactiveUser::from_row,
        )
        .bind(window(days))
    }

    /// Todos past their due date and not completed, earliest due first
    pub fn overdue_todos(&self) -> ReportQuery<'conn, Todo> {
        ReportQuery::new(
            self.conn,
            format!(
                "SELECT {} FROM todos WHERE todos.status != 'completed' \
                 AND todos.due_date IS NOT NULL AND todos.due_date < datetime('now') \
                 ORDER BY todos.due_date, todos.id",
                TODO_COLUMNS
            ),
            Todo::from_row,
        )
    }

    /// Todo count per status; statuses with no todos are omitted
    pub fn status_counts(&self) -> ReportQuery<'conn, StatusCount> {
        ReportQuery::new(
            self.conn,
            "SELECT status, COUNT(*) AS count FROM todos GROUP BY status ORDER BY status",
            StatusCount::from_row,
        )
    }

    /// Row count of `table`
    pub fn count(&self, table: Table) -> Result<i64> {
        let count = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", table.name()),
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn window(days: u32) -> String {
    format!("-{} days", days)
}
