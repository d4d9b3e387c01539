//! Migration files and the migration-apply seam
//!
//! Migrations are `.sql` files applied in file-name order. Statements inside
//! a file are separated by breakpoint marker lines emitted by the schema-diff
//! tool. Every applied migration is recorded with a SHA-256 of its content.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Line separating statements of one migration file
pub const BREAKPOINT_MARKER: &str = "--> statement-breakpoint";

/// Extension of migration files
pub const MIGRATION_EXTENSION: &str = "sql";

static BLOCK_COMMENT: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"(?s)/\*.*?\*/").expect("valid block comment regex"));

/// Remove every `/* ... */` span (shortest match, across lines)
pub fn strip_block_comments(content: &str) -> std::borrow::Cow<'_, str> {
    BLOCK_COMMENT.replace_all(content, "")
}

/// A line is live when it is non-blank and not a `--` comment
pub fn is_live_line(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && !trimmed.starts_with("--")
}

/// True when some line outside block comments is live SQL
pub fn has_live_sql(content: &str) -> bool {
    strip_block_comments(content).split('\n').any(is_live_line)
}

/// True when the trimmed line is exactly the breakpoint marker
pub fn is_breakpoint(line: &str) -> bool {
    line.trim() == BREAKPOINT_MARKER
}

/// One migration file as read from disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFile {
    pub path: PathBuf,

    /// File name, which also orders migrations
    pub name: String,

    pub raw_content: String,
}

impl MigrationFile {
    /// Read a migration file
    pub fn read(path: &Path) -> Result<Self, MigrationError> {
        let raw_content = std::fs::read_to_string(path).map_err(|source| MigrationError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            raw_content,
        })
    }

    /// Hex SHA-256 of the raw content
    pub fn checksum(&self) -> String {
        hex::encode(Sha256::digest(self.raw_content.as_bytes()))
    }

    /// Breakpoint-delimited chunks that contain live SQL
    pub fn statements(&self) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current: Vec<&str> = Vec::new();

        for line in self.raw_content.split('\n') {
            if is_breakpoint(line) {
                chunks.push(current.join("\n"));
                current.clear();
            } else {
                current.push(line);
            }
        }
        chunks.push(current.join("\n"));

        chunks
            .into_iter()
            .filter(|chunk| has_live_sql(chunk))
            .map(|chunk| chunk.trim().to_string())
            .collect()
    }
}

/// Paths of all migration files in `dir`, sorted by file name
pub fn list_migrations(dir: &Path) -> Result<Vec<PathBuf>, MigrationError> {
    let io_err = |source: std::io::Error| MigrationError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        let is_migration = path.is_file()
            && path.extension().and_then(|e| e.to_str()) == Some(MIGRATION_EXTENSION);
        if is_migration {
            paths.push(path);
        }
    }

    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(paths)
}

/// Read every migration file in `dir`, in apply order
pub fn load_migrations(dir: &Path) -> Result<Vec<MigrationFile>, MigrationError> {
    list_migrations(dir)?
        .iter()
        .map(|path| MigrationFile::read(path))
        .collect()
}

/// Rows of the history table
///
/// Databases first migrated by drizzle-kit's own migrator hold rows with a
/// hash but no name. Those hashes are the same SHA-256 that
/// [`MigrationFile::checksum`] computes, so they can be matched back to files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationHistory {
    /// Migration name -> checksum
    pub named: HashMap<String, String>,

    /// Checksums recorded without a name, oldest first
    pub unnamed: Vec<String>,
}

impl MigrationHistory {
    /// Give names to unnamed rows whose checksum matches a migration not yet
    /// recorded by name. Each unnamed row is claimed at most once. Returns the
    /// adopted `(name, checksum)` pairs in migration order.
    pub fn adopt_unnamed(&mut self, migrations: &[MigrationFile]) -> Vec<(String, String)> {
        let mut adopted = Vec::new();

        for migration in migrations {
            if self.unnamed.is_empty() {
                break;
            }
            if self.named.contains_key(&migration.name) {
                continue;
            }

            let checksum = migration.checksum();
            if let Some(index) = self.unnamed.iter().position(|hash| *hash == checksum) {
                self.unnamed.remove(index);
                self.named.insert(migration.name.clone(), checksum.clone());
                adopted.push((migration.name.clone(), checksum));
            }
        }

        adopted
    }
}

/// Migrations not yet recorded in `history` (name -> checksum), in order.
/// A recorded migration whose file no longer matches its checksum is drift.
pub fn pending_migrations<'a>(
    migrations: &'a [MigrationFile],
    history: &HashMap<String, String>,
) -> Result<Vec<&'a MigrationFile>, MigrationError> {
    let mut pending = Vec::new();

    for migration in migrations {
        match history.get(&migration.name) {
            Some(recorded) => {
                let actual = migration.checksum();
                if *recorded != actual {
                    return Err(MigrationError::ChecksumMismatch {
                        name: migration.name.clone(),
                        recorded: recorded.clone(),
                        actual,
                    });
                }
            }
            None => pending.push(migration),
        }
    }

    Ok(pending)
}

/// Outcome of one apply run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplySummary {
    /// Names of migrations applied by this run
    pub applied: Vec<String>,

    /// Migrations that were already recorded
    pub already_applied: usize,
}

/// Errors from loading or applying migrations
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Migration {name} was modified after being applied (recorded {recorded}, found {actual})")]
    ChecksumMismatch {
        name: String,
        recorded: String,
        actual: String,
    },

    #[error("Migration {name} failed: {message}")]
    Execution { name: String, message: String },

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Applies not-yet-applied migrations and records them, so that repeated
/// runs against the same database are no-ops
#[async_trait::async_trait]
pub trait MigrationExecutor: Send + Sync {
    /// Get the executor name (e.g., "PostgreSQL")
    fn name(&self) -> &'static str;

    /// Apply every pending migration in `dir`, in order, in one transaction
    async fn apply_pending(&self, dir: &Path) -> Result<ApplySummary, MigrationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn migration(name: &str, content: &str) -> MigrationFile {
        MigrationFile {
            path: PathBuf::from(name),
            name: name.to_string(),
            raw_content: content.to_string(),
        }
    }

    #[test]
    fn live_sql_detection() {
        assert!(has_live_sql("CREATE TABLE t (id int);"));
        assert!(!has_live_sql("-- only a comment\n\n   -- another"));
        assert!(!has_live_sql("/* block\nCREATE TABLE t (id int);\n*/\n--> statement-breakpoint"));
        assert!(has_live_sql("/* a */ SELECT 1; /* b */"));
    }

    #[test]
    fn block_comments_are_non_greedy() {
        let stripped = strip_block_comments("/* a */ keep /* b */");
        assert_eq!(stripped, " keep ");
    }

    #[test]
    fn statements_split_on_breakpoints() {
        let m = migration(
            "0001_init.sql",
            "CREATE TABLE a (id int);\n--> statement-breakpoint\n-- CREATE TABLE b (id int);\n--> statement-breakpoint\nCREATE INDEX a_idx ON a (id);\n",
        );
        assert_eq!(
            m.statements(),
            vec!["CREATE TABLE a (id int);", "CREATE INDEX a_idx ON a (id);"]
        );
    }

    #[test]
    fn checksum_is_stable_hex() {
        let m = migration("0000.sql", "SELECT 1;");
        assert_eq!(m.checksum().len(), 64);
        assert_eq!(m.checksum(), migration("other.sql", "SELECT 1;").checksum());
    }

    #[test]
    fn pending_skips_recorded_and_detects_drift() {
        let first = migration("0000_a.sql", "SELECT 1;");
        let second = migration("0001_b.sql", "SELECT 2;");
        let migrations = vec![first.clone(), second];

        let mut history = HashMap::new();
        history.insert(first.name.clone(), first.checksum());
        let pending = pending_migrations(&migrations, &history).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].name, "0001_b.sql");

        history.insert(first.name.clone(), "stale".to_string());
        let err = pending_migrations(&migrations, &history).unwrap_err();
        assert!(matches!(err, MigrationError::ChecksumMismatch { .. }));
    }

    #[test]
    fn unnamed_rows_are_adopted_by_checksum() {
        let first = migration("0000_a.sql", "CREATE TABLE a (id int);");
        let second = migration("0001_b.sql", "CREATE TABLE b (id int);");
        let third = migration("0002_c.sql", "CREATE TABLE c (id int);");
        let migrations = vec![first.clone(), second.clone(), third];

        let mut history = MigrationHistory {
            named: HashMap::new(),
            unnamed: vec![first.checksum(), second.checksum(), "unknown".to_string()],
        };
        let adopted = history.adopt_unnamed(&migrations);

        assert_eq!(
            adopted,
            vec![
                (first.name.clone(), first.checksum()),
                (second.name.clone(), second.checksum()),
            ]
        );
        assert_eq!(history.unnamed, vec!["unknown".to_string()]);

        let pending = pending_migrations(&migrations, &history.named).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].name, "0002_c.sql");
    }

    #[test]
    fn unnamed_row_is_claimed_once() {
        let first = migration("0000_a.sql", "SELECT 1;");
        let copy = migration("0001_copy.sql", "SELECT 1;");
        let migrations = vec![first.clone(), copy];

        let mut history = MigrationHistory {
            named: HashMap::new(),
            unnamed: vec![first.checksum()],
        };
        let adopted = history.adopt_unnamed(&migrations);

        assert_eq!(adopted.len(), 1);
        assert_eq!(adopted[0].0, "0000_a.sql");
        let pending = pending_migrations(&migrations, &history.named).unwrap();
        assert_eq!(pending[0].name, "0001_copy.sql");
    }

    #[test]
    fn named_rows_are_not_readopted() {
        let first = migration("0000_a.sql", "SELECT 1;");
        let mut history = MigrationHistory::default();
        history.named.insert(first.name.clone(), first.checksum());
        history.unnamed.push(first.checksum());

        assert!(history.adopt_unnamed(&[first]).is_empty());
        assert_eq!(history.unnamed.len(), 1);
    }
}
