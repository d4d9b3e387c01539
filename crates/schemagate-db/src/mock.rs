//! In-memory migration executor and table store for testing
//!
//! Neither type touches a database. They keep their state behind
//! `Arc<RwLock<..>>` so clones observe the same history and tables, which lets
//! a test hand one clone to the code under test and inspect the other.
//!
//! ## Simulating Failures
//!
//! ```rust,ignore
//! // Fail while applying one migration; nothing from the run is recorded
//! let migrator = InMemoryMigrator::new().with_failure_on("0002_bad.sql");
//!
//! // Fail inserts into one table
//! let store = InMemoryStore::new().with_insert_failure("equation");
//! ```

use crate::migration::{
    load_migrations, pending_migrations, ApplySummary, MigrationError, MigrationExecutor,
    MigrationHistory,
};
use crate::store::{row_columns, StoreError, TableHandle, TableStore};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct MigratorState {
    history: MigrationHistory,

    /// Every statement executed by committed runs, in order
    executed: Vec<String>,
}

/// Migration executor that records history in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryMigrator {
    state: Arc<RwLock<MigratorState>>,
    fail_on: Option<String>,
}

impl InMemoryMigrator {
    /// Create a migrator with empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail when the named migration is reached
    pub fn with_failure_on(mut self, name: impl Into<String>) -> Self {
        self.fail_on = Some(name.into());
        self
    }

    /// Pre-record a migration as applied with the given checksum
    pub async fn record(&self, name: impl Into<String>, checksum: impl Into<String>) {
        self.state
            .write()
            .await
            .history
            .named
            .insert(name.into(), checksum.into());
    }

    /// Pre-record a checksum without a name, as drizzle-kit's migrator does
    pub async fn record_unnamed(&self, checksum: impl Into<String>) {
        self.state.write().await.history.unnamed.push(checksum.into());
    }

    /// Checksums still recorded without a name
    pub async fn unnamed(&self) -> Vec<String> {
        self.state.read().await.history.unnamed.clone()
    }

    /// Names of recorded migrations, sorted
    pub async fn applied(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.read().await.history.named.keys().cloned().collect();
        names.sort();
        names
    }

    /// Statements executed by committed runs
    pub async fn executed_statements(&self) -> Vec<String> {
        self.state.read().await.executed.clone()
    }
}

#[async_trait::async_trait]
impl MigrationExecutor for InMemoryMigrator {
    fn name(&self) -> &'static str {
        "InMemory"
    }

    async fn apply_pending(&self, dir: &Path) -> Result<ApplySummary, MigrationError> {
        let migrations = load_migrations(dir)?;
        let mut state = self.state.write().await;

        let mut history = state.history.clone();
        history.adopt_unnamed(&migrations);
        let pending = pending_migrations(&migrations, &history.named)?;
        let already_applied = migrations.len() - pending.len();

        // Stage everything and only commit once the whole run succeeded
        let mut staged_history = Vec::new();
        let mut staged_statements = Vec::new();
        for migration in pending {
            if self.fail_on.as_deref() == Some(migration.name.as_str()) {
                return Err(MigrationError::Execution {
                    name: migration.name.clone(),
                    message: "simulated failure".to_string(),
                });
            }
            staged_statements.extend(migration.statements());
            staged_history.push((migration.name.clone(), migration.checksum()));
        }

        let applied = staged_history.iter().map(|(name, _)| name.clone()).collect();
        history.named.extend(staged_history);
        state.history = history;
        state.executed.extend(staged_statements);

        Ok(ApplySummary {
            applied,
            already_applied,
        })
    }
}

/// Table store that keeps rows in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<HashMap<String, Vec<serde_json::Value>>>>,
    insert_failures: HashSet<String>,
    delete_failures: HashSet<String>,
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every insert into `table`
    pub fn with_insert_failure(mut self, table: impl Into<String>) -> Self {
        self.insert_failures.insert(table.into());
        self
    }

    /// Fail every delete from `table`
    pub fn with_delete_failure(mut self, table: impl Into<String>) -> Self {
        self.delete_failures.insert(table.into());
        self
    }

    /// Replace the contents of a table
    pub async fn seed(&self, table: &TableHandle, rows: Vec<serde_json::Value>) {
        self.tables.write().await.insert(table.to_string(), rows);
    }

    /// Current rows of a table (empty if never written)
    pub async fn rows(&self, table: &TableHandle) -> Vec<serde_json::Value> {
        self.tables
            .read()
            .await
            .get(&table.to_string())
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl TableStore for InMemoryStore {
    fn name(&self) -> &'static str {
        "InMemory"
    }

    async fn delete_all(&self, table: &TableHandle) -> Result<u64, StoreError> {
        let key = table.to_string();
        if self.delete_failures.contains(&key) {
            return Err(StoreError::Query {
                table: key,
                message: "simulated delete failure".to_string(),
            });
        }

        let removed = self
            .tables
            .write()
            .await
            .remove(&key)
            .map(|rows| rows.len())
            .unwrap_or(0);
        Ok(removed as u64)
    }

    async fn insert_rows(
        &self,
        table: &TableHandle,
        rows: Vec<serde_json::Value>,
    ) -> Result<u64, StoreError> {
        let key = table.to_string();
        if self.insert_failures.contains(&key) {
            return Err(StoreError::Query {
                table: key,
                message: "simulated insert failure".to_string(),
            });
        }

        row_columns(table, &rows)?;
        let inserted = rows.len() as u64;
        self.tables.write().await.entry(key).or_default().extend(rows);
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    #[tokio::test]
    async fn store_delete_then_insert() {
        let store = InMemoryStore::new();
        let table = TableHandle::new("equation");
        store.seed(&table, vec![json!({"a": 1}), json!({"a": 2})]).await;

        assert_eq!(store.delete_all(&table).await.unwrap(), 2);
        assert_eq!(store.insert_rows(&table, vec![json!({"a": 3})]).await.unwrap(), 1);
        assert_eq!(store.rows(&table).await, vec![json!({"a": 3})]);
    }

    #[tokio::test]
    async fn store_simulated_failures() {
        let table = TableHandle::new("equation");
        let store = InMemoryStore::new()
            .with_insert_failure("equation")
            .with_delete_failure("equation");

        assert!(store.delete_all(&table).await.is_err());
        assert!(store.insert_rows(&table, vec![json!({"a": 1})]).await.is_err());
    }

    #[tokio::test]
    async fn migrator_failure_records_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("0000_a.sql"), "SELECT 1;").unwrap();
        fs::write(tmp.path().join("0001_b.sql"), "SELECT 2;").unwrap();

        let migrator = InMemoryMigrator::new().with_failure_on("0001_b.sql");
        let err = migrator.apply_pending(tmp.path()).await.unwrap_err();

        assert!(matches!(err, MigrationError::Execution { ref name, .. } if name == "0001_b.sql"));
        assert!(migrator.applied().await.is_empty());
        assert!(migrator.executed_statements().await.is_empty());
    }
}
