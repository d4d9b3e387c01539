//! Database access for migrations and fixture tables
//!
//! This crate defines the two seams the pipeline talks to a database through:
//! [`MigrationExecutor`] applies pending migration files and records them,
//! [`TableStore`] clears and bulk-loads fixture tables.
//!
//! ## Features
//!
//! - `postgres` - PostgreSQL support via tokio-postgres
//! - `tls` - TLS connections via native-tls (implies `postgres`)
//!
//! Without `postgres` the PostgreSQL types still exist but every call returns
//! a configuration error. The in-memory implementations in [`mock`] are
//! always available.
//!
//! ## Example
//!
//! ```rust,ignore
//! use schemagate_db::{ConnectionSettings, MigrationExecutor, PostgresMigrator};
//!
//! let settings = ConnectionSettings::from_env("DATABASE_URL", "PROJECT_NAME", false)?;
//! let migrator = PostgresMigrator::connect(&settings).await?;
//! let summary = migrator.apply_pending(Path::new("migrations")).await?;
//! ```

pub mod connection;
pub mod migration;
pub mod mock;
pub mod postgres;
pub mod store;

pub use connection::ConnectionSettings;
pub use migration::{
    has_live_sql, is_breakpoint, list_migrations, load_migrations, pending_migrations,
    ApplySummary, MigrationError, MigrationExecutor, MigrationFile, MigrationHistory,
    BREAKPOINT_MARKER,
};
pub use mock::{InMemoryMigrator, InMemoryStore};
pub use postgres::{PostgresMigrator, PostgresStore};
pub use store::{quote_ident, StoreError, TableHandle, TableStore};
