//! Migration sanitizing and applying
//!
//! Before migrations are handed to a [`MigrationExecutor`], every file is
//! checked for being *neutralized* (all SQL commented out). Neutralized files
//! lose their orphaned breakpoint markers; active files are left untouched.
//!
//! ```rust,ignore
//! use schemagate_migrate::MigrationApplier;
//!
//! let applier = MigrationApplier::new(Arc::new(PostgresMigrator::connect(&settings).await?));
//! let summary = applier.apply_all(Path::new("migrations")).await?;
//! ```

pub mod applier;
pub mod sanitizer;
pub mod snapshot;

pub use applier::{sanitize_dir, ApplyError, MigrationApplier, SanitizeReport};
pub use sanitizer::{is_neutralized, sanitize, strip_breakpoints, SanitizeOutcome};
pub use schemagate_db::migration::{ApplySummary, MigrationExecutor, MigrationFile};
pub use snapshot::{ensure_snapshot_meta, SnapshotError, META_KEYS};
