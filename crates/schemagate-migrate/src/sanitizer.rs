//! Neutralized migration detection and breakpoint cleanup
//!
//! A migration is *neutralized* when every statement in it has been commented
//! out. The breakpoint markers between those statements are then orphaned and
//! would be read as empty statement boundaries, so they are removed. Active
//! migrations are never touched.

use schemagate_db::migration::{has_live_sql, is_breakpoint, MigrationError, MigrationFile};

/// True when no line outside block comments is live SQL
pub fn is_neutralized(content: &str) -> bool {
    !has_live_sql(content)
}

/// Drop every breakpoint marker line; remaining lines are joined with `\n`
pub fn strip_breakpoints(content: &str) -> String {
    content
        .split('\n')
        .filter(|line| !is_breakpoint(line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// What [`sanitize`] did to a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanitizeOutcome {
    /// Active, or neutralized with no markers left
    Unchanged,

    /// Neutralized file rewritten without its markers
    Neutralized { removed_markers: usize },
}

/// Sanitize one migration in place
///
/// The file is only written when its content changes, so active files stay
/// byte-identical and a second run is a no-op.
pub fn sanitize(file: &mut MigrationFile) -> Result<SanitizeOutcome, MigrationError> {
    if !is_neutralized(&file.raw_content) {
        return Ok(SanitizeOutcome::Unchanged);
    }

    let removed_markers = file
        .raw_content
        .split('\n')
        .filter(|line| is_breakpoint(line))
        .count();
    if removed_markers == 0 {
        return Ok(SanitizeOutcome::Unchanged);
    }

    let cleaned = strip_breakpoints(&file.raw_content);
    std::fs::write(&file.path, &cleaned).map_err(|source| MigrationError::Io {
        path: file.path.clone(),
        source,
    })?;
    file.raw_content = cleaned;

    tracing::info!(
        migration = %file.name,
        removed_markers,
        "removed breakpoints from neutralized migration"
    );
    Ok(SanitizeOutcome::Neutralized { removed_markers })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const NEUTRALIZED: &str = "-- CREATE TABLE \"a\" (\"id\" int);\n--> statement-breakpoint\n/* ALTER TABLE \"a\"\n   ADD COLUMN \"b\" int; */\n--> statement-breakpoint\n";

    #[test]
    fn classification() {
        assert!(is_neutralized(""));
        assert!(is_neutralized("   \n\t\n"));
        assert!(is_neutralized(NEUTRALIZED));
        assert!(!is_neutralized("CREATE TABLE a (id int);\n--> statement-breakpoint\n"));
        assert!(!is_neutralized("/* header */\nSELECT 1;"));
    }

    #[test]
    fn markers_removed_other_lines_kept() {
        let stripped = strip_breakpoints(NEUTRALIZED);
        assert_eq!(
            stripped,
            "-- CREATE TABLE \"a\" (\"id\" int);\n/* ALTER TABLE \"a\"\n   ADD COLUMN \"b\" int; */\n"
        );
    }

    #[test]
    fn indented_marker_is_a_marker() {
        assert_eq!(strip_breakpoints("-- x\n   --> statement-breakpoint  \n-- y"), "-- x\n-- y");
        assert_eq!(
            strip_breakpoints("-- x --> statement-breakpoint"),
            "-- x --> statement-breakpoint"
        );
    }

    #[test]
    fn sanitize_rewrites_once() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("0003_drop.sql");
        fs::write(&path, NEUTRALIZED).unwrap();

        let mut file = MigrationFile::read(&path).unwrap();
        assert_eq!(
            sanitize(&mut file).unwrap(),
            SanitizeOutcome::Neutralized { removed_markers: 2 }
        );
        assert_eq!(fs::read_to_string(&path).unwrap(), file.raw_content);

        let mut again = MigrationFile::read(&path).unwrap();
        assert_eq!(sanitize(&mut again).unwrap(), SanitizeOutcome::Unchanged);
    }
}
