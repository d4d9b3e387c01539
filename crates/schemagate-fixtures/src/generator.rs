//! Seeded fixture generation and delete-then-insert refresh
//!
//! A [`RowGenerator`] builds one row at a time from a random source. The
//! [`FixtureRefresher`] owns that source, seeded once at construction, so two
//! refreshers built with the same seed and generator produce the same rows.
//!
//! ```rust,ignore
//! let mut refresher = FixtureRefresher::new(1, TableHandle::new("equation"), 25, generator, store);
//! match refresher.refresh().await? {
//!     RefreshOutcome::Refreshed { inserted, .. } => println!("{} rows", inserted),
//!     RefreshOutcome::InsertFailed { reason, .. } => eprintln!("{}", reason),
//! }
//! ```

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use schemagate_db::{StoreError, TableHandle, TableStore};
use serde::Serialize;
use std::sync::Arc;

/// Builds fixture rows for one table
pub trait RowGenerator: Send + Sync {
    /// Row type; serialized field names are the table's column names
    type Row: Serialize;

    /// Build the next row, drawing all randomness from `rng`
    fn generate_row(&mut self, rng: &mut ChaCha8Rng) -> Self::Row;
}

/// What a refresh did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Refreshed { deleted: u64, inserted: u64 },

    /// Existing rows were deleted but the new rows could not be written
    InsertFailed { deleted: u64, reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error("Failed to clear {table}: {source}")]
    Delete {
        table: String,
        #[source]
        source: StoreError,
    },

    #[error("Refresh task for {table} failed: {message}")]
    Task { table: String, message: String },

    #[error("Invalid reference time '{value}': {message}")]
    InvalidReferenceTime { value: String, message: String },
}

/// Round to two decimal places, nudged by `f64::EPSILON` so that values
/// like `1.005` round up
pub fn round_to_two_decimal_places(value: f64) -> f64 {
    ((value + f64::EPSILON) * 100.0).round() / 100.0
}

/// Refreshes one table from a seeded [`RowGenerator`]
pub struct FixtureRefresher<G: RowGenerator> {
    seed: u64,
    table: TableHandle,
    row_count: usize,
    rng: ChaCha8Rng,
    generator: G,
    store: Arc<dyn TableStore>,
}

impl<G: RowGenerator> FixtureRefresher<G> {
    pub fn new(
        seed: u64,
        table: TableHandle,
        row_count: usize,
        generator: G,
        store: Arc<dyn TableStore>,
    ) -> Self {
        Self {
            seed,
            table,
            row_count,
            rng: ChaCha8Rng::seed_from_u64(seed),
            generator,
            store,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn table(&self) -> &TableHandle {
        &self.table
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Call the generator exactly `count` times, in order
    pub fn generate_rows(&mut self, count: usize) -> Vec<G::Row> {
        (0..count)
            .map(|_| self.generator.generate_row(&mut self.rng))
            .collect()
    }

    /// Remove every row of the target table
    pub async fn delete_all_rows(&self) -> Result<u64, FixtureError> {
        self.store
            .delete_all(&self.table)
            .await
            .map_err(|source| FixtureError::Delete {
                table: self.table.to_string(),
                source,
            })
    }

    /// Delete all rows, then insert `row_count` freshly generated rows in one
    /// write. Delete failures are errors; insert failures are logged and
    /// reported as [`RefreshOutcome::InsertFailed`] so a batch can go on.
    pub async fn refresh(&mut self) -> Result<RefreshOutcome, FixtureError> {
        let deleted = self.delete_all_rows().await?;
        tracing::debug!(table = %self.table, deleted, "cleared fixture table");

        let values = {
            let rows = self.generate_rows(self.row_count);
            rows.iter()
                .map(serde_json::to_value)
                .collect::<Result<Vec<_>, _>>()
        };
        let values = match values {
            Ok(values) => values,
            Err(e) => return Ok(self.insert_failed(deleted, format!("serialize rows: {}", e))),
        };

        match self.store.insert_rows(&self.table, values).await {
            Ok(inserted) => {
                tracing::info!(table = %self.table, inserted, seed = self.seed, "fixture table refreshed");
                Ok(RefreshOutcome::Refreshed { deleted, inserted })
            }
            Err(e) => Ok(self.insert_failed(deleted, e.to_string())),
        }
    }

    fn insert_failed(&self, deleted: u64, reason: String) -> RefreshOutcome {
        tracing::warn!(table = %self.table, %reason, "fixture insert failed");
        RefreshOutcome::InsertFailed { deleted, reason }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use schemagate_db::InMemoryStore;

    #[derive(Serialize)]
    struct Counter {
        n: u32,
        draw: u32,
    }

    struct CountingGenerator {
        calls: u32,
    }

    impl RowGenerator for CountingGenerator {
        type Row = Counter;

        fn generate_row(&mut self, rng: &mut ChaCha8Rng) -> Counter {
            self.calls += 1;
            Counter {
                n: self.calls,
                draw: rng.random_range(0..1000),
            }
        }
    }

    fn refresher(seed: u64, store: Arc<dyn TableStore>) -> FixtureRefresher<CountingGenerator> {
        FixtureRefresher::new(
            seed,
            TableHandle::new("counter"),
            3,
            CountingGenerator { calls: 0 },
            store,
        )
    }

    #[test]
    fn rounding() {
        assert_eq!(round_to_two_decimal_places(1.005), 1.01);
        assert_eq!(round_to_two_decimal_places(2.344), 2.34);
        assert_eq!(round_to_two_decimal_places(99.999), 100.0);
        assert_eq!(round_to_two_decimal_places(-1.255), -1.25);
    }

    #[test]
    fn generate_rows_calls_in_order() {
        let mut r = refresher(7, Arc::new(InMemoryStore::new()));
        let rows = r.generate_rows(4);
        assert_eq!(rows.iter().map(|c| c.n).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
        assert!(r.generate_rows(0).is_empty());
    }

    #[test]
    fn same_seed_same_draws() {
        let store: Arc<dyn TableStore> = Arc::new(InMemoryStore::new());
        let a: Vec<u32> = refresher(7, store.clone()).generate_rows(5).iter().map(|c| c.draw).collect();
        let b: Vec<u32> = refresher(7, store.clone()).generate_rows(5).iter().map(|c| c.draw).collect();
        let c: Vec<u32> = refresher(8, store).generate_rows(5).iter().map(|c| c.draw).collect();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[tokio::test]
    async fn delete_failure_propagates() {
        let store = InMemoryStore::new().with_delete_failure("counter");
        let mut r = refresher(1, Arc::new(store));
        assert!(matches!(r.refresh().await, Err(FixtureError::Delete { .. })));
    }

    #[tokio::test]
    async fn insert_failure_is_reported_not_raised() {
        let store = InMemoryStore::new().with_insert_failure("counter");
        let mut r = refresher(1, Arc::new(store));

        let outcome = r.refresh().await.unwrap();
        assert!(matches!(outcome, RefreshOutcome::InsertFailed { deleted: 0, .. }));
    }
}
