//! Parameterized multi-row INSERT statements, keyed by batch width.

use crate::error::{Result, SeedError};
use crate::model::Record;
use std::collections::HashMap;
use std::marker::PhantomData;

/// SQLite's default bound-parameter limit (`SQLITE_MAX_VARIABLE_NUMBER`)
pub const MAX_BIND_PARAMS: usize = 32_766;

/// Build `INSERT INTO table (cols) VALUES (?, ..), (?, ..)` for `rows` rows
pub fn build_insert(table: &str, columns: &[&str], rows: usize) -> String {
    let row_template = format!("({})", vec!["?"; columns.len()].join(", "));
    let mut sql = format!("INSERT INTO {} ({}) VALUES ", table, columns.join(", "));
    sql.reserve(rows * (row_template.len() + 2));
    for i in 0..rows {
        if i > 0 {
            sql.push_str(", ");
        }
        sql.push_str(&row_template);
    }
    sql
}

/// Check that a batch of `rows` fits in one statement
pub fn check_width(columns: usize, rows: usize) -> Result<()> {
    if rows == 0 {
        return Err(SeedError::Validation("batch size must be at least 1".into()));
    }
    let params = columns.saturating_mul(rows);
    if params > MAX_BIND_PARAMS {
        return Err(SeedError::Validation(format!(
            "batch of {} rows x {} columns needs {} parameters (max {})",
            rows, columns, params, MAX_BIND_PARAMS
        )));
    }
    Ok(())
}

/// Caches statement text per batch width for one record type.
///
/// A load produces at most two widths: the full batch size and the final
/// short batch.
#[derive(Debug)]
pub struct InsertStatementCache<R> {
    statements: HashMap<usize, String>,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> InsertStatementCache<R> {
    pub fn new() -> Self {
        Self {
            statements: HashMap::new(),
            _record: PhantomData,
        }
    }

    pub fn get(&mut self, rows: usize) -> &str {
        self.statements
            .entry(rows)
            .or_insert_with(|| build_insert(R::TABLE, R::COLUMNS, rows))
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

impl<R: Record> Default for InsertStatementCache<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewUser;

    #[test]
    fn test_build_insert_single_row() {
        assert_eq!(
            build_insert("users", &["name", "email"], 1),
            "INSERT INTO users (name, email) VALUES (?, ?)"
        );
    }

    #[test]
    fn test_build_insert_multi_row() {
        let sql = build_insert("users", &["name", "email"], 3);
        assert_eq!(
            sql,
            "INSERT INTO users (name, email) VALUES (?, ?), (?, ?), (?, ?)"
        );
        assert_eq!(sql.matches('?').count(), 6);
    }

    #[test]
    fn test_check_width() {
        assert!(check_width(2, 2_500).is_ok());
        assert!(check_width(2, 0).is_err());
        assert!(check_width(5, 10_000).is_err());
        assert!(check_width(1, MAX_BIND_PARAMS).is_ok());
    }

    #[test]
    fn test_cache_reuses_width() {
        let mut cache = InsertStatementCache::<NewUser>::new();
        let full = cache.get(4).to_string();
        assert_eq!(full.matches("(?, ?)").count(), 4);
        cache.get(4);
        cache.get(1);
        assert_eq!(cache.len(), 2);
    }
}
