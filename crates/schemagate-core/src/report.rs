//! Identifier check report (report.json v1)
//!
//! The JSON layout is versioned; readers match on `version.major`.

use crate::diagnostic::{Diagnostic, DiagnosticCode, Severity};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Report schema version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportVersion {
    pub major: u32,
    pub minor: u32,
}

impl ReportVersion {
    pub const CURRENT: ReportVersion = ReportVersion { major: 1, minor: 0 };
}

impl std::fmt::Display for ReportVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Counts over one identifier check run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Total number of diagnostics
    pub total: usize,
    pub errors: usize,
    pub warnings: usize,
    pub info: usize,

    /// Schema definition files read
    pub files_checked: usize,

    /// Enum, table and column declarations validated
    pub declarations_checked: usize,
}

impl ReportSummary {
    fn tally(diagnostics: &[Diagnostic]) -> Self {
        let count = |severity: Severity| diagnostics.iter().filter(|d| d.severity == severity).count();

        Self {
            total: diagnostics.len(),
            errors: count(Severity::Error),
            warnings: count(Severity::Warn),
            info: count(Severity::Info),
            ..Self::default()
        }
    }
}

/// Output of `check-identifiers`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub version: ReportVersion,

    /// RFC 3339 time the report was produced
    pub timestamp: String,

    pub summary: ReportSummary,

    /// Every failure, in file then source order
    pub diagnostics: Vec<Diagnostic>,
}

impl Report {
    /// Build a report over `diagnostics`, stamped with the current time
    pub fn from_diagnostics(diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            version: ReportVersion::CURRENT,
            timestamp: chrono::Utc::now().to_rfc3339(),
            summary: ReportSummary::tally(&diagnostics),
            diagnostics,
        }
    }

    /// Record how much schema source was covered
    pub fn with_coverage(mut self, files_checked: usize, declarations_checked: usize) -> Self {
        self.summary.files_checked = files_checked;
        self.summary.declarations_checked = declarations_checked;
        self
    }

    /// True when at least one identifier was rejected or a file failed to load
    pub fn has_errors(&self) -> bool {
        self.summary.errors > 0
    }

    /// Number of diagnostics carrying `code`
    pub fn count_of(&self, code: DiagnosticCode) -> usize {
        self.diagnostics.iter().filter(|d| d.code == code).count()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write pretty JSON to `path`
    pub fn save_to_file(&self, path: &Path) -> Result<(), std::io::Error> {
        let json = self.to_json().map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}
