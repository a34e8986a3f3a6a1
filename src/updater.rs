//! Bulk status updates over a bounded set of todo ids.
//!
//! The caller chooses which ids to touch (see [`crate::sample`]); this
//! module only applies the change, atomically.

use crate::error::{Result, SeedError};
use crate::loader::MAX_BIND_PARAMS;
use crate::model::TodoStatus;
use rusqlite::{params, params_from_iter, Connection, ToSql, TransactionBehavior};
use tracing::{debug, info};

/// Outcome of a status update
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UpdateStats {
    /// Ids passed in (duplicates included)
    pub requested: usize,
    /// Rows that matched an id
    pub rows_changed: usize,
}

/// Applies status changes
pub struct BulkUpdater;

impl BulkUpdater {
    /// Set `status` on every todo whose id is in `ids`.
    ///
    /// `status` must be one of `pending`, `in_progress`, `completed`. All
    /// targeted rows change or none do. Ids that do not exist are ignored.
    pub fn set_status(conn: &mut Connection, status: &str, ids: &[i64]) -> Result<UpdateStats> {
        let status: TodoStatus = status.parse()?;
        if ids.is_empty() {
            return Err(SeedError::Validation(
                "status update needs at least one id".into(),
            ));
        }

        // One slot is taken by the status parameter
        let chunk_size = MAX_BIND_PARAMS - 1;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut rows_changed = 0;
        for chunk in ids.chunks(chunk_size) {
            let sql = format!(
                "UPDATE todos SET status = ? WHERE id IN ({})",
                vec!["?"; chunk.len()].join(", ")
            );
            let bound = std::iter::once(&status as &dyn ToSql)
                .chain(chunk.iter().map(|id| id as &dyn ToSql));
            rows_changed += tx.execute(&sql, params_from_iter(bound))?;
        }
        tx.commit()?;

        debug!(%status, requested = ids.len(), rows_changed, "status updated");
        Ok(UpdateStats {
            requested: ids.len(),
            rows_changed,
        })
    }

    /// Delete a user; their todos go with them through the cascading key.
    ///
    /// Returns the number of users deleted (0 or 1).
    pub fn delete_user(conn: &mut Connection, user_id: i64) -> Result<usize> {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let deleted = tx.execute("DELETE FROM users WHERE id = ?1", params![user_id])?;
        tx.commit()?;
        info!(user_id, deleted, "user deleted");
        Ok(deleted)
    }
}
