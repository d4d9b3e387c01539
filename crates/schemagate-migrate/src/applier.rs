//! Sanitize-then-apply over a migrations directory

use crate::sanitizer::{sanitize, SanitizeOutcome};
use schemagate_core::{Diagnostic, DiagnosticCode, Location, Severity};
use schemagate_db::migration::{list_migrations, ApplySummary, MigrationError, MigrationExecutor, MigrationFile};
use std::path::Path;
use std::sync::Arc;

/// Errors from [`MigrationApplier::apply_all`]
#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    #[error("Failed to sanitize migrations: {0}")]
    Sanitize(#[source] MigrationError),

    #[error("Failed to apply migrations: {0}")]
    Apply(#[source] MigrationError),
}

impl ApplyError {
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diagnostic = Diagnostic::error(DiagnosticCode::MigrationApplyError, self.to_string());
        match self {
            Self::Sanitize(MigrationError::Io { path, .. }) => {
                diagnostic.with_location(Location::new(path.display().to_string()))
            }
            _ => diagnostic,
        }
    }
}

/// Result of sanitizing a directory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SanitizeReport {
    /// Migration files inspected
    pub inspected: usize,

    /// Names of files that were rewritten
    pub rewritten: Vec<String>,
}

impl SanitizeReport {
    /// One info diagnostic per rewritten file
    pub fn to_diagnostics(&self) -> Vec<Diagnostic> {
        self.rewritten
            .iter()
            .map(|name| {
                Diagnostic::new(
                    DiagnosticCode::MigrationNeutralized,
                    Severity::Info,
                    format!("Removed breakpoints from neutralized migration {}", name),
                )
                .with_location(Location::new(name.clone()))
            })
            .collect()
    }
}

/// Sanitize every `.sql` file of `dir` in name order
pub fn sanitize_dir(dir: &Path) -> Result<SanitizeReport, MigrationError> {
    let mut report = SanitizeReport::default();

    for path in list_migrations(dir)? {
        let mut file = MigrationFile::read(&path)?;
        report.inspected += 1;

        match sanitize(&mut file)? {
            SanitizeOutcome::Neutralized { .. } => report.rewritten.push(file.name),
            SanitizeOutcome::Unchanged => {
                tracing::debug!(migration = %file.name, "migration unchanged");
            }
        }
    }

    Ok(report)
}

/// Applies a migrations directory through a [`MigrationExecutor`]
pub struct MigrationApplier {
    executor: Arc<dyn MigrationExecutor>,
}

impl MigrationApplier {
    pub fn new(executor: Arc<dyn MigrationExecutor>) -> Self {
        Self { executor }
    }

    /// Sanitize every migration, then hand the directory to the executor.
    /// Partial state after a failed apply is whatever the executor left.
    pub async fn apply_all(&self, dir: &Path) -> Result<ApplySummary, ApplyError> {
        let report = sanitize_dir(dir).map_err(ApplyError::Sanitize)?;
        for diagnostic in report.to_diagnostics() {
            tracing::info!("{}", diagnostic);
        }
        tracing::info!(
            inspected = report.inspected,
            rewritten = report.rewritten.len(),
            "sanitized migrations"
        );

        let summary = self
            .executor
            .apply_pending(dir)
            .await
            .map_err(ApplyError::Apply)?;

        tracing::info!(
            executor = self.executor.name(),
            applied = summary.applied.len(),
            already_applied = summary.already_applied,
            "migrations applied"
        );
        Ok(summary)
    }
}
