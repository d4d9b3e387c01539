//! schemagate core
//!
//! Shared domain model: diagnostics, the report.json format and the
//! `schemagate.toml` configuration.
//! Never rename diagnostic codes - they are part of the public API.

pub mod diagnostic;
pub mod report;
pub mod config;

pub use diagnostic::{Diagnostic, DiagnosticCode, Severity, Location};
pub use report::{Report, ReportVersion, ReportSummary};
pub use config::{Config, ConfigError, SchemaConfig, MigrationsConfig, FixturesConfig, DatabaseConfig};
