//! Diagnostic codes and error reporting
//!
//! IMPORTANT: Diagnostic codes are versioned and stable.
//! NEVER rename or remove codes - they are part of the public API.
//! Add new codes with new names only.

use serde::{Deserialize, Serialize};

/// Diagnostic code registry (v1)
///
/// These codes are STABLE and VERSIONED.
/// Do NOT rename or remove codes - only add new ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticCode {
    // Identifier rules (1xxx)
    /// Identifier begins with a decimal digit
    IdentStartsWithDigit,

    /// Identifier contains a character outside [A-Za-z0-9_]
    IdentIllegalCharacter,

    /// Identifier collides with a reserved word of a downstream consumer
    IdentReservedWord,

    /// Column property key differs from the declared column name literal
    ColumnKeyLiteralMismatch,

    // Schema structure (2xxx)
    /// Schema source could not be parsed
    SchemaParseError,

    /// A schema module directory is missing a required file
    SchemaMissingFile,

    /// A schema module directory (or the schema root) holds an unexpected file
    SchemaUnexpectedFile,

    // Migrations (3xxx)
    /// Migration file is fully commented out
    MigrationNeutralized,

    /// Migration failed to apply
    MigrationApplyError,
}

impl DiagnosticCode {
    /// Get the diagnostic code as a stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IdentStartsWithDigit => "IDENT_STARTS_WITH_DIGIT",
            Self::IdentIllegalCharacter => "IDENT_ILLEGAL_CHARACTER",
            Self::IdentReservedWord => "IDENT_RESERVED_WORD",
            Self::ColumnKeyLiteralMismatch => "COLUMN_KEY_LITERAL_MISMATCH",
            Self::SchemaParseError => "SCHEMA_PARSE_ERROR",
            Self::SchemaMissingFile => "SCHEMA_MISSING_FILE",
            Self::SchemaUnexpectedFile => "SCHEMA_UNEXPECTED_FILE",
            Self::MigrationNeutralized => "MIGRATION_NEUTRALIZED",
            Self::MigrationApplyError => "MIGRATION_APPLY_ERROR",
        }
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message
    Info,

    /// Warning - should be reviewed but not blocking
    Warn,

    /// Error - blocking issue that should fail the gate
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Source location in a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// File path relative to project root
    pub file: String,

    /// Optional line number (1-indexed)
    pub line: Option<usize>,

    /// Optional column number (1-indexed)
    pub column: Option<usize>,
}

impl Location {
    /// Create a new location with just a file path
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line: None,
            column: None,
        }
    }

    /// Create a location with file, line, and column
    pub fn with_position(file: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            file: file.into(),
            line: Some(line),
            column: Some(column),
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.line, self.column) {
            (Some(line), Some(column)) => write!(f, "{}:{}:{}", self.file, line, column),
            (Some(line), None) => write!(f, "{}:{}", self.file, line),
            _ => write!(f, "{}", self.file),
        }
    }
}

/// A diagnostic message with structured metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Stable diagnostic code
    pub code: DiagnosticCode,

    /// Severity level
    pub severity: Severity,

    /// Human-readable message
    pub message: String,

    /// Source location (best-effort)
    pub location: Option<Location>,

    /// Expected value (the column's property key)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,

    /// Actual value (the declared column name literal)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
}

impl Diagnostic {
    /// Create a new diagnostic with minimal fields
    pub fn new(code: DiagnosticCode, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            code,
            severity,
            message: message.into(),
            location: None,
            expected: None,
            actual: None,
        }
    }

    /// Shorthand for an error-severity diagnostic
    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Error, message)
    }

    /// Set the location
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Set expected/actual values
    pub fn with_comparison(mut self, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self.actual = Some(actual.into());
        self
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(location) = &self.location {
            write!(f, "{}: ", location)?;
        }
        write!(f, "{} [{}] {}", self.severity, self.code, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_code_stability() {
        assert_eq!(DiagnosticCode::IdentReservedWord.as_str(), "IDENT_RESERVED_WORD");
        assert_eq!(DiagnosticCode::ColumnKeyLiteralMismatch.as_str(), "COLUMN_KEY_LITERAL_MISMATCH");
    }

    #[test]
    fn diagnostic_serialization() {
        let diag = Diagnostic::error(
            DiagnosticCode::IdentStartsWithDigit,
            "Identifier '1table' starts with a digit",
        )
        .with_location(Location::with_position("schema/orders/schema.ts", 4, 30));

        let json = serde_json::to_string(&diag).unwrap();
        assert!(json.contains("IDENT_STARTS_WITH_DIGIT"));
        assert!(json.contains("error"));
        assert!(!json.contains("expected"));
    }

    #[test]
    fn comparison_roundtrips_through_json() {
        let diag = Diagnostic::error(DiagnosticCode::ColumnKeyLiteralMismatch, "key differs")
            .with_comparison("amount", "amt");

        let json = serde_json::to_string(&diag).unwrap();
        let parsed: Diagnostic = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.expected.as_deref(), Some("amount"));
        assert_eq!(parsed.actual.as_deref(), Some("amt"));
    }

    #[test]
    fn diagnostic_display_includes_location() {
        let diag = Diagnostic::error(DiagnosticCode::IdentReservedWord, "'select' is reserved")
            .with_location(Location::with_position("schema/a/schema.ts", 2, 7));

        assert_eq!(
            diag.to_string(),
            "schema/a/schema.ts:2:7: error [IDENT_RESERVED_WORD] 'select' is reserved"
        );
    }
}
