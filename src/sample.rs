//! Bounded random sampling of row ids.
//!
//! Sampling is a caller-side policy: it decides which ids a bulk update
//! touches. Ids are streamed from the store through a fixed-size reservoir,
//! so memory stays bounded by the sample size however large the table is.
//! Successive samples may overlap; status updates are idempotent.

use crate::error::Result;
use crate::model::Table;
use rand::rngs::StdRng;
use rand::Rng;
use rusqlite::Connection;

/// Reservoir sampler using Algorithm R.
///
/// Maintains a fixed-size sample of items seen so far,
/// with each item having equal probability of being in the sample.
#[derive(Debug)]
pub struct Reservoir<T> {
    capacity: usize,
    count: usize,
    items: Vec<T>,
    rng: StdRng,
}

impl<T> Reservoir<T> {
    pub fn new(capacity: usize, rng: StdRng) -> Self {
        Self {
            capacity,
            count: 0,
            items: Vec::with_capacity(capacity),
            rng,
        }
    }

    /// Consider an item for inclusion in the reservoir
    pub fn consider(&mut self, item: T) {
        self.count += 1;

        if self.items.len() < self.capacity {
            self.items.push(item);
        } else {
            let j = self.rng.random_range(0..self.count);
            if j < self.capacity {
                self.items[j] = item;
            }
        }
    }

    pub fn total_seen(&self) -> usize {
        self.count
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Consume the reservoir, returning the sample and the RNG for reuse
    pub fn into_parts(self) -> (Vec<T>, StdRng) {
        (self.items, self.rng)
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

/// Sample up to `count` ids from `table`, uniformly at random.
///
/// Returns fewer than `count` ids only when the table is smaller.
pub fn sample_ids(conn: &Connection, table: Table, count: usize, rng: StdRng) -> Result<Vec<i64>> {
    Ok(sample_ids_with_rng(conn, table, count, rng)?.0)
}

/// As [`sample_ids`], handing the RNG back so repeated rounds keep drawing
/// from the same stream.
pub fn sample_ids_with_rng(
    conn: &Connection,
    table: Table,
    count: usize,
    rng: StdRng,
) -> Result<(Vec<i64>, StdRng)> {
    let mut reservoir = Reservoir::new(count, rng);
    let mut stmt = conn.prepare(&format!("SELECT id FROM {}", table.name()))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        reservoir.consider(row.get::<_, i64>(0)?);
    }
    Ok(reservoir.into_parts())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_reservoir_fills_then_holds_capacity() {
        let mut reservoir = Reservoir::new(10, StdRng::seed_from_u64(42));
        for i in 0..5 {
            reservoir.consider(i);
        }
        assert_eq!(reservoir.len(), 5);

        for i in 5..1_000 {
            reservoir.consider(i);
        }
        assert_eq!(reservoir.len(), 10);
        assert_eq!(reservoir.total_seen(), 1_000);

        let items: HashSet<_> = reservoir.into_items().into_iter().collect();
        assert_eq!(items.len(), 10, "sample must not repeat items");
        assert!(items.iter().all(|i| (0..1_000).contains(i)));
    }

    #[test]
    fn test_reservoir_zero_capacity() {
        let mut reservoir = Reservoir::new(0, StdRng::seed_from_u64(1));
        for i in 0..100 {
            reservoir.consider(i);
        }
        assert!(reservoir.is_empty());
    }

    #[test]
    fn test_reservoir_deterministic_for_seed() {
        let run = |seed| {
            let mut r = Reservoir::new(5, StdRng::seed_from_u64(seed));
            (0..500).for_each(|i| r.consider(i));
            r.into_items()
        };
        assert_eq!(run(7), run(7));
    }
}
