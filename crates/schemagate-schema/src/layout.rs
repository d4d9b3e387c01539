//! Schema directory layout check
//!
//! Each schema module lives in its own directory under the schema root and
//! must contain exactly the required files. Only a fixed set of shared files
//! may sit directly in the root.

use schemagate_core::{Diagnostic, DiagnosticCode, Location, SchemaConfig};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Extra files \"{}\" found in {}", .files.join(", "), .path.display())]
    ExtraFiles { path: PathBuf, files: Vec<String> },

    #[error("Missing files \"{}\" in {}", .files.join(", "), .path.display())]
    MissingFiles { path: PathBuf, files: Vec<String> },

    #[error("Unexpected file \"{file}\" found in {}", .root.display())]
    UnexpectedRootFile { root: PathBuf, file: String },
}

impl LayoutError {
    pub fn to_diagnostic(&self) -> Diagnostic {
        let (code, path) = match self {
            Self::Io { path, .. } => (DiagnosticCode::SchemaParseError, path.clone()),
            Self::ExtraFiles { path, .. } => (DiagnosticCode::SchemaUnexpectedFile, path.clone()),
            Self::MissingFiles { path, .. } => (DiagnosticCode::SchemaMissingFile, path.clone()),
            Self::UnexpectedRootFile { root, file } => {
                (DiagnosticCode::SchemaUnexpectedFile, root.join(file))
            }
        };
        Diagnostic::error(code, self.to_string())
            .with_location(Location::new(path.display().to_string()))
    }
}

/// Schema module found by the layout check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaModule {
    pub name: String,
    pub dir: PathBuf,
}

/// Check the layout below `root` and return the modules in name order.
/// Stops at the first offending directory or file.
pub fn check_layout(root: &Path, config: &SchemaConfig) -> Result<Vec<SchemaModule>, LayoutError> {
    let required: BTreeSet<&str> = config.required_files.iter().map(String::as_str).collect();
    let mut modules = Vec::new();

    for (name, path, is_dir) in sorted_entries(root)? {
        if is_dir {
            let contents: BTreeSet<String> = sorted_entries(&path)?
                .into_iter()
                .map(|(name, _, _)| name)
                .collect();

            let extra: Vec<String> = contents
                .iter()
                .filter(|f| !required.contains(f.as_str()))
                .cloned()
                .collect();
            if !extra.is_empty() {
                return Err(LayoutError::ExtraFiles { path, files: extra });
            }

            let missing: Vec<String> = required
                .iter()
                .filter(|f| !contents.contains(**f))
                .map(|f| f.to_string())
                .collect();
            if !missing.is_empty() {
                return Err(LayoutError::MissingFiles { path, files: missing });
            }

            modules.push(SchemaModule { name, dir: path });
        } else if !config.allowed_root_files.contains(&name) {
            return Err(LayoutError::UnexpectedRootFile {
                root: root.to_path_buf(),
                file: name,
            });
        }
    }

    tracing::info!(modules = modules.len(), "schema layout is valid");
    Ok(modules)
}

fn sorted_entries(dir: &Path) -> Result<Vec<(String, PathBuf, bool)>, LayoutError> {
    let io_err = |source: std::io::Error| LayoutError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let file_type = entry.file_type().map_err(io_err)?;
        entries.push((
            entry.file_name().to_string_lossy().into_owned(),
            entry.path(),
            file_type.is_dir(),
        ));
    }
    entries.sort();
    Ok(entries)
}
