//! PostgreSQL implementations of the migration and table seams
//!
//! ## Usage
//!
//! ```rust,ignore
//! let settings = ConnectionSettings::from_env("DATABASE_URL", "PROJECT_NAME", true)?;
//!
//! let migrator = PostgresMigrator::connect(&settings).await?;
//! migrator.apply_pending(Path::new("migrations")).await?;
//!
//! let store = PostgresStore::connect(&settings).await?;
//! store.delete_all(&TableHandle::new("equation")).await?;
//! ```
//!
//! Applied migrations are recorded in `drizzle.__drizzle_migrations`
//! together with the SHA-256 of each file. Rows written by drizzle-kit's own
//! migrator carry no name; they are matched to files by hash and given one.

use crate::connection::ConnectionSettings;
use crate::migration::{
    load_migrations, pending_migrations, ApplySummary, MigrationError, MigrationExecutor,
    MigrationHistory,
};
use crate::store::{quote_ident, row_columns, StoreError, TableHandle, TableStore};
use std::path::Path;

#[cfg(feature = "postgres")]
use tokio_postgres::{Client, NoTls};

#[cfg(feature = "tls")]
use native_tls::TlsConnector;

#[cfg(feature = "tls")]
use postgres_native_tls::MakeTlsConnector;

/// Schema and table holding migration history
pub const HISTORY_SCHEMA: &str = "drizzle";
pub const HISTORY_TABLE: &str = "__drizzle_migrations";

/// Open a client and drive its connection on a background task
#[cfg(feature = "postgres")]
pub async fn connect(settings: &ConnectionSettings) -> Result<Client, String> {
    if settings.tls {
        return connect_tls(settings).await;
    }

    let (client, connection) = tokio_postgres::connect(&settings.url, NoTls)
        .await
        .map_err(|e| format!("Failed to connect to {:?}: {}", settings, e))?;

    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!(error = %e, "PostgreSQL connection error");
        }
    });

    Ok(client)
}

#[cfg(feature = "tls")]
async fn connect_tls(settings: &ConnectionSettings) -> Result<Client, String> {
    let connector = TlsConnector::builder()
        .build()
        .map_err(|e| format!("Failed to create TLS connector: {}", e))?;
    let tls = MakeTlsConnector::new(connector);

    let (client, connection) = tokio_postgres::connect(&settings.url, tls)
        .await
        .map_err(|e| format!("Failed to connect with TLS to {:?}: {}", settings, e))?;

    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!(error = %e, "PostgreSQL TLS connection error");
        }
    });

    Ok(client)
}

#[cfg(all(feature = "postgres", not(feature = "tls")))]
async fn connect_tls(_settings: &ConnectionSettings) -> Result<Client, String> {
    Err("TLS support not compiled. Rebuild with: cargo build --features tls".to_string())
}

const NOT_COMPILED: &str = "PostgreSQL support not compiled. Rebuild with: cargo build --features postgres";

/// Migration executor backed by a PostgreSQL connection
pub struct PostgresMigrator {
    #[cfg(feature = "postgres")]
    client: tokio::sync::Mutex<Client>,

    #[cfg(not(feature = "postgres"))]
    _phantom: std::marker::PhantomData<()>,
}

impl PostgresMigrator {
    /// Connect using `settings`
    #[cfg(feature = "postgres")]
    pub async fn connect(settings: &ConnectionSettings) -> Result<Self, MigrationError> {
        let client = connect(settings).await.map_err(MigrationError::Connection)?;
        Ok(Self::from_client(client))
    }

    /// Create migrator without postgres feature (returns error)
    #[cfg(not(feature = "postgres"))]
    pub async fn connect(_settings: &ConnectionSettings) -> Result<Self, MigrationError> {
        Err(MigrationError::ConfigError(NOT_COMPILED.to_string()))
    }

    /// Wrap an existing client
    #[cfg(feature = "postgres")]
    pub fn from_client(client: Client) -> Self {
        Self {
            client: tokio::sync::Mutex::new(client),
        }
    }

    #[cfg(feature = "postgres")]
    async fn recorded_history(client: &Client) -> Result<MigrationHistory, MigrationError> {
        let ddl = format!(
            "CREATE SCHEMA IF NOT EXISTS {schema};
             CREATE TABLE IF NOT EXISTS {schema}.{table} (
                 id SERIAL PRIMARY KEY,
                 name text,
                 hash text NOT NULL,
                 created_at bigint
             );
             ALTER TABLE {schema}.{table} ADD COLUMN IF NOT EXISTS name text;",
            schema = quote_ident(HISTORY_SCHEMA),
            table = quote_ident(HISTORY_TABLE),
        );
        client
            .batch_execute(&ddl)
            .await
            .map_err(|e| MigrationError::Query(e.to_string()))?;

        let query = format!(
            "SELECT name, hash FROM {}.{} ORDER BY id",
            quote_ident(HISTORY_SCHEMA),
            quote_ident(HISTORY_TABLE)
        );
        let rows = client
            .query(query.as_str(), &[])
            .await
            .map_err(|e| MigrationError::Query(e.to_string()))?;

        let mut history = MigrationHistory::default();
        for row in &rows {
            let hash: String = row.get(1);
            match row.get::<_, Option<String>>(0) {
                Some(name) => {
                    history.named.insert(name, hash);
                }
                None => history.unnamed.push(hash),
            }
        }
        Ok(history)
    }
}

#[async_trait::async_trait]
impl MigrationExecutor for PostgresMigrator {
    fn name(&self) -> &'static str {
        "PostgreSQL"
    }

    #[cfg(feature = "postgres")]
    async fn apply_pending(&self, dir: &Path) -> Result<ApplySummary, MigrationError> {
        let migrations = load_migrations(dir)?;
        let mut client = self.client.lock().await;

        let mut history = Self::recorded_history(&client).await?;
        let adopted = history.adopt_unnamed(&migrations);
        let pending = pending_migrations(&migrations, &history.named)?;

        let mut summary = ApplySummary {
            applied: Vec::new(),
            already_applied: migrations.len() - pending.len(),
        };
        if pending.is_empty() && adopted.is_empty() {
            tracing::info!("no pending migrations");
            return Ok(summary);
        }

        let insert = format!(
            "INSERT INTO {}.{} (name, hash, created_at) VALUES ($1, $2, $3)",
            quote_ident(HISTORY_SCHEMA),
            quote_ident(HISTORY_TABLE)
        );
        let backfill = format!(
            "UPDATE {schema}.{table} SET name = $1 WHERE id = (
                 SELECT id FROM {schema}.{table}
                 WHERE name IS NULL AND hash = $2
                 ORDER BY id LIMIT 1
             )",
            schema = quote_ident(HISTORY_SCHEMA),
            table = quote_ident(HISTORY_TABLE),
        );
        let tx = client
            .transaction()
            .await
            .map_err(|e| MigrationError::Query(e.to_string()))?;

        for (name, checksum) in &adopted {
            tx.execute(backfill.as_str(), &[name, checksum])
                .await
                .map_err(|e| MigrationError::Query(e.to_string()))?;
            tracing::info!(migration = %name, "adopted unnamed history row");
        }

        for migration in pending {
            let failed = |e: tokio_postgres::Error| MigrationError::Execution {
                name: migration.name.clone(),
                message: e.to_string(),
            };

            for statement in migration.statements() {
                tx.batch_execute(&statement).await.map_err(failed)?;
            }

            let created_at = chrono::Utc::now().timestamp_millis();
            tx.execute(
                insert.as_str(),
                &[&migration.name, &migration.checksum(), &created_at],
            )
            .await
            .map_err(failed)?;

            tracing::info!(migration = %migration.name, "applied migration");
            summary.applied.push(migration.name.clone());
        }

        tx.commit()
            .await
            .map_err(|e| MigrationError::Query(e.to_string()))?;

        Ok(summary)
    }

    #[cfg(not(feature = "postgres"))]
    async fn apply_pending(&self, _dir: &Path) -> Result<ApplySummary, MigrationError> {
        Err(MigrationError::ConfigError(NOT_COMPILED.to_string()))
    }
}

/// Table store backed by a PostgreSQL connection
pub struct PostgresStore {
    #[cfg(feature = "postgres")]
    client: Client,

    #[cfg(not(feature = "postgres"))]
    _phantom: std::marker::PhantomData<()>,
}

impl PostgresStore {
    /// Connect using `settings`
    #[cfg(feature = "postgres")]
    pub async fn connect(settings: &ConnectionSettings) -> Result<Self, StoreError> {
        let client = connect(settings).await.map_err(StoreError::Connection)?;
        Ok(Self { client })
    }

    /// Create store without postgres feature (returns error)
    #[cfg(not(feature = "postgres"))]
    pub async fn connect(_settings: &ConnectionSettings) -> Result<Self, StoreError> {
        Err(StoreError::ConfigError(NOT_COMPILED.to_string()))
    }

    /// Bulk insert statement: rows arrive as one JSON array parameter and
    /// are expanded against the table's row type
    pub fn insert_statement(table: &TableHandle, columns: &[String]) -> String {
        let column_list = columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "INSERT INTO {table} ({columns}) SELECT {columns} FROM json_populate_recordset(NULL::{table}, $1::json)",
            table = table.sql_ref(),
            columns = column_list,
        )
    }
}

#[async_trait::async_trait]
impl TableStore for PostgresStore {
    fn name(&self) -> &'static str {
        "PostgreSQL"
    }

    #[cfg(feature = "postgres")]
    async fn delete_all(&self, table: &TableHandle) -> Result<u64, StoreError> {
        let statement = format!("DELETE FROM {}", table.sql_ref());
        self.client
            .execute(statement.as_str(), &[])
            .await
            .map_err(|e| StoreError::Query {
                table: table.to_string(),
                message: e.to_string(),
            })
    }

    #[cfg(not(feature = "postgres"))]
    async fn delete_all(&self, _table: &TableHandle) -> Result<u64, StoreError> {
        Err(StoreError::ConfigError(NOT_COMPILED.to_string()))
    }

    #[cfg(feature = "postgres")]
    async fn insert_rows(
        &self,
        table: &TableHandle,
        rows: Vec<serde_json::Value>,
    ) -> Result<u64, StoreError> {
        let columns = row_columns(table, &rows)?;
        if columns.is_empty() {
            return Ok(0);
        }

        let statement = Self::insert_statement(table, &columns);
        let payload = serde_json::Value::Array(rows);
        self.client
            .execute(statement.as_str(), &[&payload])
            .await
            .map_err(|e| StoreError::Query {
                table: table.to_string(),
                message: e.to_string(),
            })
    }

    #[cfg(not(feature = "postgres"))]
    async fn insert_rows(
        &self,
        _table: &TableHandle,
        _rows: Vec<serde_json::Value>,
    ) -> Result<u64, StoreError> {
        Err(StoreError::ConfigError(NOT_COMPILED.to_string()))
    }
}
