//! Configuration schema (schemagate.toml)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Schema source settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    /// Directory holding one sub-directory per schema module
    pub root: PathBuf,

    /// File name of the schema definition inside each module
    pub schema_file: String,

    /// Callee name of the enum declaration constructor
    pub enum_constructor: String,

    /// Callee name of the table declaration constructor
    pub table_constructor: String,

    /// Files every schema module directory must contain (and nothing else)
    pub required_files: Vec<String>,

    /// Files allowed directly under the schema root
    pub allowed_root_files: Vec<String>,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("schema"),
            schema_file: "schema.ts".to_string(),
            enum_constructor: "pgEnum".to_string(),
            table_constructor: "pgTable".to_string(),
            required_files: vec!["refreshTestData.ts".to_string(), "schema.ts".to_string()],
            allowed_root_files: vec!["util.ts".to_string()],
        }
    }
}

/// Migration history settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationsConfig {
    /// Directory of ordered `.sql` migration files
    pub dir: PathBuf,

    /// Initial snapshot emitted by the schema-diff tool
    pub snapshot: PathBuf,
}

impl Default for MigrationsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("migrations"),
            snapshot: PathBuf::from("migrations/meta/0000_snapshot.json"),
        }
    }
}

/// Fixture refresh settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixturesConfig {
    /// Fixed reference instant (RFC 3339) for date columns.
    /// When absent, the start of the current UTC day is used.
    pub reference_date: Option<String>,

    /// Override the per-module seed
    pub seed: Option<u64>,

    /// Override the per-module row count
    pub rows: Option<usize>,
}

/// Database connection settings (credentials come from the environment)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Environment variable holding the connection URL
    pub url_env: String,

    /// Environment variable holding the project name passed as a startup option
    pub project_env: String,

    /// Require TLS on the connection (hosted Postgres refuses plaintext)
    pub tls: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url_env: "DATABASE_URL".to_string(),
            project_env: "PROJECT_NAME".to_string(),
            tls: true,
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Schema sources
    #[serde(default)]
    pub schema: SchemaConfig,

    /// Migration files
    #[serde(default)]
    pub migrations: MigrationsConfig,

    /// Fixture refresh
    #[serde(default)]
    pub fixtures: FixturesConfig,

    /// Database connection
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Project root path (for resolving relative paths)
    #[serde(skip)]
    pub project_root: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema: SchemaConfig::default(),
            migrations: MigrationsConfig::default(),
            fixtures: FixturesConfig::default(),
            database: DatabaseConfig::default(),
            project_root: std::env::current_dir().unwrap_or_default(),
        }
    }
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;

        let mut config = Self::from_toml(&contents)?;

        // Set project root to parent of config file
        if let Some(parent) = path.parent() {
            config.project_root = parent.to_path_buf();
        }

        Ok(config)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.project_root = std::env::current_dir().unwrap_or_default();
        Ok(config)
    }

    /// Resolve a configured path against the project root
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }

    /// Absolute schema root
    pub fn schema_root(&self) -> PathBuf {
        self.resolve(&self.schema.root)
    }

    /// Absolute migrations directory
    pub fn migrations_dir(&self) -> PathBuf {
        self.resolve(&self.migrations.dir)
    }

    /// Absolute snapshot path
    pub fn snapshot_path(&self) -> PathBuf {
        self.resolve(&self.migrations.snapshot)
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.schema.enum_constructor, "pgEnum");
        assert_eq!(config.schema.table_constructor, "pgTable");
        assert_eq!(config.migrations.dir, PathBuf::from("migrations"));
        assert_eq!(config.database.url_env, "DATABASE_URL");
        assert!(config.database.tls);
    }

    #[test]
    fn tls_can_be_disabled_for_local_servers() {
        let config = Config::from_toml("[database]\ntls = false").unwrap();
        assert!(!config.database.tls);
        assert_eq!(config.database.project_env, "PROJECT_NAME");
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [schema]
            root = "db/schema"
            table_constructor = "sqliteTable"

            [fixtures]
            seed = 7
            "#,
        )
        .unwrap();

        assert_eq!(config.schema.root, PathBuf::from("db/schema"));
        assert_eq!(config.schema.table_constructor, "sqliteTable");
        assert_eq!(config.schema.enum_constructor, "pgEnum");
        assert_eq!(config.schema.required_files.len(), 2);
        assert_eq!(config.fixtures.seed, Some(7));
        assert_eq!(config.migrations, MigrationsConfig::default());
    }

    #[test]
    fn invalid_toml_is_parse_error() {
        let err = Config::from_toml("[schema\nroot = 1").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn resolve_relative_against_root() {
        let mut config = Config::default();
        config.project_root = PathBuf::from("/work/project");

        assert_eq!(config.migrations_dir(), PathBuf::from("/work/project/migrations"));
        assert_eq!(config.resolve(Path::new("/abs/x")), PathBuf::from("/abs/x"));
    }

    #[test]
    fn config_toml_roundtrip() {
        let config = Config::default();
        let toml = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();
        assert_eq!(config.schema, parsed.schema);
    }
}
