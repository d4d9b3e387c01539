//! Integration tests for sanitizing and applying a migrations directory

use pretty_assertions::assert_eq;
use schemagate_db::{ApplySummary, InMemoryMigrator, MigrationError, MigrationExecutor};
use schemagate_migrate::{
    sanitize, sanitize_dir, ApplyError, MigrationApplier, MigrationFile, SanitizeOutcome,
};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

const ACTIVE: &str = "CREATE TABLE \"equation\" (\n  \"id\" serial PRIMARY KEY\n);\n--> statement-breakpoint\n-- trailing note\n";

const NEUTRALIZED: &str = "/*\nCREATE TABLE \"legacy\" (\"id\" int);\n*/\n--> statement-breakpoint\n\n-- DROP TABLE \"legacy\";\n  --> statement-breakpoint\n";

fn write(dir: &Path, name: &str, content: &str) -> MigrationFile {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    MigrationFile::read(&path).unwrap()
}

#[test]
fn sanitize_is_idempotent() {
    let tmp = tempfile::tempdir().unwrap();
    for (name, content) in [("0000_active.sql", ACTIVE), ("0001_off.sql", NEUTRALIZED)] {
        let mut file = write(tmp.path(), name, content);
        sanitize(&mut file).unwrap();
        let once = fs::read_to_string(&file.path).unwrap();

        let mut reread = MigrationFile::read(&file.path).unwrap();
        assert_eq!(sanitize(&mut reread).unwrap(), SanitizeOutcome::Unchanged);
        assert_eq!(fs::read_to_string(&file.path).unwrap(), once);
    }
}

#[test]
fn neutralized_file_loses_every_marker() {
    let tmp = tempfile::tempdir().unwrap();
    let mut file = write(tmp.path(), "0001_off.sql", NEUTRALIZED);

    sanitize(&mut file).unwrap();

    let content = fs::read_to_string(&file.path).unwrap();
    assert!(content.lines().all(|l| l.trim() != "--> statement-breakpoint"));
    assert!(content.contains("-- DROP TABLE \"legacy\";"));
}

#[test]
fn active_file_is_byte_identical() {
    let tmp = tempfile::tempdir().unwrap();
    let mut file = write(tmp.path(), "0000_active.sql", ACTIVE);
    let before = fs::metadata(&file.path).unwrap().modified().unwrap();

    assert_eq!(sanitize(&mut file).unwrap(), SanitizeOutcome::Unchanged);

    assert_eq!(fs::read_to_string(&file.path).unwrap(), ACTIVE);
    assert_eq!(fs::metadata(&file.path).unwrap().modified().unwrap(), before);
}

#[test]
fn non_sql_files_are_ignored() {
    let tmp = tempfile::tempdir().unwrap();
    write(tmp.path(), "0001_off.sql", NEUTRALIZED);
    fs::write(tmp.path().join("README.md"), NEUTRALIZED).unwrap();
    fs::create_dir(tmp.path().join("meta")).unwrap();

    let report = sanitize_dir(tmp.path()).unwrap();

    assert_eq!(report.inspected, 1);
    assert_eq!(report.rewritten, vec!["0001_off.sql"]);
    assert_eq!(fs::read_to_string(tmp.path().join("README.md")).unwrap(), NEUTRALIZED);
}

/// Executor that checks the directory was sanitized before it was called
struct AssertSanitized {
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl MigrationExecutor for AssertSanitized {
    fn name(&self) -> &'static str {
        "AssertSanitized"
    }

    async fn apply_pending(&self, dir: &Path) -> Result<ApplySummary, MigrationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let content = fs::read_to_string(dir.join("0001_off.sql")).unwrap();
        assert!(!content.contains("--> statement-breakpoint"));
        Err(MigrationError::Execution {
            name: "0001_off.sql".to_string(),
            message: "rejected".to_string(),
        })
    }
}

#[tokio::test]
async fn executor_sees_sanitized_directory_and_errors_propagate() {
    let tmp = tempfile::tempdir().unwrap();
    write(tmp.path(), "0000_active.sql", ACTIVE);
    write(tmp.path(), "0001_off.sql", NEUTRALIZED);

    let executor = Arc::new(AssertSanitized {
        calls: AtomicUsize::new(0),
    });
    let applier = MigrationApplier::new(executor.clone());
    let err = applier.apply_all(tmp.path()).await.unwrap_err();

    assert!(matches!(err, ApplyError::Apply(MigrationError::Execution { .. })));
    assert_eq!(executor.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn repeated_apply_is_a_no_op() {
    let tmp = tempfile::tempdir().unwrap();
    write(tmp.path(), "0000_active.sql", ACTIVE);
    write(tmp.path(), "0001_off.sql", NEUTRALIZED);

    let migrator = InMemoryMigrator::new();
    let applier = MigrationApplier::new(Arc::new(migrator.clone()));

    let first = applier.apply_all(tmp.path()).await.unwrap();
    assert_eq!(first.applied.len(), 2);

    let second = applier.apply_all(tmp.path()).await.unwrap();
    assert!(second.applied.is_empty());
    assert_eq!(second.already_applied, 2);
    assert_eq!(migrator.applied().await, vec!["0000_active.sql", "0001_off.sql"]);
}
