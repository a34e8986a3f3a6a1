//! Batched, transactional bulk loading.
//!
//! Records are pulled lazily from the input and grouped into batches of a
//! fixed size. Each batch is one transaction holding one multi-row INSERT,
//! so a failing row rolls back exactly its own batch. Batches run strictly
//! one after another; the store has a single writer.

mod statement;

pub use statement::{build_insert, check_width, InsertStatementCache, MAX_BIND_PARAMS};

use crate::error::{Result, SeedError};
use crate::model::Record;
use indicatif::ProgressBar;
use rusqlite::{Connection, ToSql, TransactionBehavior};
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, warn};

/// Statistics from a completed load
#[derive(Debug, Default, Clone, Serialize)]
pub struct LoadStats {
    /// Rows committed
    pub rows_committed: u64,
    /// Batch transactions committed
    pub batches_committed: u64,
    /// Load duration in seconds
    pub duration_secs: f64,
}

impl LoadStats {
    pub fn rows_per_second(&self) -> f64 {
        if self.duration_secs > 0.0 {
            self.rows_committed as f64 / self.duration_secs
        } else {
            0.0
        }
    }
}

impl std::fmt::Display for LoadStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} rows in {} batches in {:.2}s ({:.0} rows/s)",
            self.rows_committed,
            self.batches_committed,
            self.duration_secs,
            self.rows_per_second()
        )
    }
}

/// Loads records in fixed-size batches
#[derive(Debug, Clone)]
pub struct BatchLoader {
    batch_size: usize,
    progress: Option<ProgressBar>,
}

impl BatchLoader {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size,
            progress: None,
        }
    }

    /// Advance `progress` by each committed batch's row count
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn progress(&self) -> Option<&ProgressBar> {
        self.progress.as_ref()
    }

    /// Insert every record from `records`.
    ///
    /// At most one batch is held in memory. Stops at the first failed batch
    /// and returns [`SeedError::Batch`] carrying the batch's index and the
    /// rows committed before it; earlier batches stay committed.
    pub fn load<R, I>(&self, conn: &mut Connection, records: I) -> Result<LoadStats>
    where
        R: Record,
        I: IntoIterator<Item = R>,
    {
        check_width(R::COLUMNS.len(), self.batch_size)?;

        let start = Instant::now();
        let mut stats = LoadStats::default();
        let mut cache = InsertStatementCache::<R>::new();
        let mut records = records.into_iter();
        let mut batch: Vec<R> = Vec::with_capacity(self.batch_size);

        loop {
            batch.clear();
            batch.extend(records.by_ref().take(self.batch_size));
            if batch.is_empty() {
                break;
            }

            let index = stats.batches_committed as usize;
            match insert_batch(conn, &mut cache, &batch) {
                Ok(inserted) => {
                    stats.rows_committed += inserted as u64;
                    stats.batches_committed += 1;
                    if let Some(ref pb) = self.progress {
                        pb.inc(inserted as u64);
                    }
                    debug!(table = R::TABLE, batch = index, rows = inserted, "batch committed");
                }
                Err(e) => {
                    warn!(table = R::TABLE, batch = index, error = %e, "batch rolled back");
                    return Err(SeedError::Batch {
                        index,
                        committed_rows: stats.rows_committed,
                        source: Box::new(e),
                    });
                }
            }

            if batch.len() < self.batch_size {
                break;
            }
        }

        stats.duration_secs = start.elapsed().as_secs_f64();
        Ok(stats)
    }
}

/// Insert `rows` as one multi-row statement in one transaction.
///
/// Dropping the transaction on any error rolls it back.
fn insert_batch<R: Record>(
    conn: &mut Connection,
    cache: &mut InsertStatementCache<R>,
    rows: &[R],
) -> Result<usize> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let inserted = {
        let mut stmt = tx.prepare_cached(cache.get(rows.len()))?;
        let mut params: Vec<&dyn ToSql> = Vec::with_capacity(rows.len() * R::COLUMNS.len());
        for row in rows {
            row.bind(&mut params);
        }
        stmt.execute(params.as_slice())?
    };
    tx.commit()?;
    Ok(inserted)
}
