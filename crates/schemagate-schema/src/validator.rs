//! Identifier validation over schema sources
//!
//! Runs the declaration walker over every schema file and applies the
//! identifier rule to every declared name. Parse problems are structural and
//! abort at once; identifier problems are collected across all files and
//! reported together.

use crate::rule::{check_identifier, IdentifierViolation};
use crate::syntax::{SourceTree, Span, SyntaxError};
use crate::walker::{Constructors, DeclarationSite, SchemaDeclarationWalker, SiteKind};
use schemagate_core::{Diagnostic, DiagnosticCode, Location};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Why a declared identifier failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureReason {
    StartsWithDigit,
    IllegalCharacter,
    ReservedWord,
    KeyLiteralMismatch,
}

impl FailureReason {
    pub fn code(&self) -> DiagnosticCode {
        match self {
            Self::StartsWithDigit => DiagnosticCode::IdentStartsWithDigit,
            Self::IllegalCharacter => DiagnosticCode::IdentIllegalCharacter,
            Self::ReservedWord => DiagnosticCode::IdentReservedWord,
            Self::KeyLiteralMismatch => DiagnosticCode::ColumnKeyLiteralMismatch,
        }
    }
}

impl From<&IdentifierViolation> for FailureReason {
    fn from(violation: &IdentifierViolation) -> Self {
        match violation {
            IdentifierViolation::StartsWithDigit(_) => Self::StartsWithDigit,
            IdentifierViolation::IllegalCharacter { .. } => Self::IllegalCharacter,
            IdentifierViolation::ReservedWord(_) => Self::ReservedWord,
        }
    }
}

/// One rejected identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub file: PathBuf,
    pub identifier: String,
    pub reason: FailureReason,
    pub kind: SiteKind,
    pub span: Span,
    pub message: String,

    /// Declared name literal of the site, if it had one
    pub literal_name: Option<String>,
}

impl ValidationFailure {
    pub fn to_diagnostic(&self) -> Diagnostic {
        let location = Location::with_position(
            self.file.display().to_string(),
            self.span.line,
            self.span.column,
        );
        let diagnostic =
            Diagnostic::error(self.reason.code(), self.message.clone()).with_location(location);

        match self.reason {
            FailureReason::KeyLiteralMismatch => diagnostic.with_comparison(
                self.identifier.clone(),
                self.literal_name.as_deref().unwrap_or("<none>"),
            ),
            _ => diagnostic,
        }
    }
}

impl std::fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}",
            self.file.display(),
            self.span.line,
            self.span.column,
            self.message
        )
    }
}

/// Validation errors: structural ones stop the run, `Invalid` carries every
/// identifier failure found
#[derive(Debug, thiserror::Error)]
pub enum ValidateError {
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {error}", .path.display())]
    Parse { path: PathBuf, error: SyntaxError },

    #[error("{} invalid identifier(s) in schema sources", .0.len())]
    Invalid(Vec<ValidationFailure>),
}

impl ValidateError {
    /// Diagnostics for the report
    pub fn to_diagnostics(&self) -> Vec<Diagnostic> {
        match self {
            Self::Invalid(failures) => failures.iter().map(ValidationFailure::to_diagnostic).collect(),
            Self::Parse { path, error } => vec![Diagnostic::error(
                DiagnosticCode::SchemaParseError,
                error.message.clone(),
            )
            .with_location(Location::with_position(
                path.display().to_string(),
                error.span.line,
                error.span.column,
            ))],
            Self::Io { path, source } => vec![Diagnostic::error(
                DiagnosticCode::SchemaParseError,
                source.to_string(),
            )
            .with_location(Location::new(path.display().to_string()))],
        }
    }
}

/// Counts for a successful (or failed) run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationSummary {
    pub files_checked: usize,
    pub sites_checked: usize,
}

/// Result of checking one source unit
#[derive(Debug, Clone, Default)]
pub struct FileCheck {
    pub sites: Vec<DeclarationSite>,
    pub failures: Vec<ValidationFailure>,
}

/// Validates declared identifiers across schema files
pub struct IdentifierValidator {
    constructors: Constructors,
}

impl IdentifierValidator {
    pub fn new(constructors: Constructors) -> Self {
        Self { constructors }
    }

    /// Validate every file; all identifier failures are collected before
    /// returning `ValidateError::Invalid`
    pub fn validate<P: AsRef<Path>>(&self, files: &[P]) -> Result<ValidationSummary, ValidateError> {
        let mut summary = ValidationSummary::default();
        let mut failures = Vec::new();

        for file in files {
            let path = file.as_ref();
            let source = std::fs::read_to_string(path).map_err(|source| ValidateError::Io {
                path: path.to_path_buf(),
                source,
            })?;

            let check = self.check_source(path, &source)?;
            tracing::debug!(
                file = %path.display(),
                sites = check.sites.len(),
                failures = check.failures.len(),
                "checked schema file"
            );

            summary.files_checked += 1;
            summary.sites_checked += check.sites.len();
            failures.extend(check.failures);
        }

        if failures.is_empty() {
            Ok(summary)
        } else {
            Err(ValidateError::Invalid(failures))
        }
    }

    /// Parse and check a single source unit
    pub fn check_source(&self, path: &Path, source: &str) -> Result<FileCheck, ValidateError> {
        let tree = SourceTree::parse(source).map_err(|error| ValidateError::Parse {
            path: path.to_path_buf(),
            error,
        })?;

        let sites = SchemaDeclarationWalker::collect(&tree, path, &self.constructors);
        let failures = sites.iter().filter_map(check_site).collect();

        Ok(FileCheck { sites, failures })
    }
}

impl Default for IdentifierValidator {
    fn default() -> Self {
        Self::new(Constructors::default())
    }
}

/// Apply the identifier rule (and, for columns, the key/literal rule)
pub fn check_site(site: &DeclarationSite) -> Option<ValidationFailure> {
    let failure = |identifier: &str, reason: FailureReason, message: String| ValidationFailure {
        file: site.source_file.clone(),
        identifier: identifier.to_string(),
        reason,
        kind: site.kind,
        span: site.span,
        message,
        literal_name: site.literal_name.clone(),
    };

    let identifier = match site.kind {
        SiteKind::Column => site.property_key.as_deref().unwrap_or_default(),
        SiteKind::Enum | SiteKind::Table => site.literal_name.as_deref().unwrap_or_default(),
    };

    if let Err(violation) = check_identifier(identifier) {
        let message = format!("{} {}", site.kind, violation);
        return Some(failure(identifier, FailureReason::from(&violation), message));
    }

    if site.kind == SiteKind::Column && site.literal_name.as_deref() != Some(identifier) {
        let message = match &site.literal_name {
            Some(literal) => format!(
                "column key '{}' does not match declared column name '{}'",
                identifier, literal
            ),
            None => format!("column key '{}' has no declared column name literal", identifier),
        };
        return Some(failure(identifier, FailureReason::KeyLiteralMismatch, message));
    }

    None
}

/// Find every schema definition file (`file_name`) below `root`, sorted
pub fn discover_schema_files(root: &Path, file_name: &str) -> Result<Vec<PathBuf>, ValidateError> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(|e| ValidateError::Io {
            path: e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf()),
            source: e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("filesystem loop")),
        })?;

        if entry.file_type().is_file() && entry.file_name() == file_name {
            files.push(entry.into_path());
        }
    }

    files.sort();
    Ok(files)
}
