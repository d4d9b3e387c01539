use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use schemagate_core::{Config, Diagnostic, DiagnosticCode, Report, Severity};
use schemagate_db::{ConnectionSettings, PostgresMigrator, PostgresStore, TableStore};
use schemagate_fixtures::{all_units, parse_reference_time, refresh_all, FixtureOptions, RefreshOutcome};
use schemagate_migrate::{ensure_snapshot_meta, MigrationApplier};
use schemagate_schema::{check_layout, discover_schema_files, Constructors, IdentifierValidator};

/// SchemaGate - schema-change safety checks for Postgres projects
#[derive(Parser)]
#[command(name = "schemagate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: schemagate.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate table, enum and column names in every schema file
    CheckIdentifiers {
        /// Output file for report.json
        #[arg(short, long, default_value = "report.json")]
        output: PathBuf,
    },

    /// Check that every schema module has exactly the expected files
    CheckLayout,

    /// Sanitize neutralized migrations and apply pending ones
    ApplyMigrations,

    /// Replace fixture table contents with freshly generated rows
    RefreshFixtures {
        /// Seed for every module instead of its default
        #[arg(long)]
        seed: Option<u64>,

        /// Row count for every module instead of its default
        #[arg(long)]
        rows: Option<usize>,
    },

    /// Add the `_meta` block to the initial migration snapshot
    AddMeta,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            tracing::warn!(error = %e, "failed to load .env");
        }
    }

    let config = if let Some(config_path) = &cli.config {
        Config::from_file(config_path)?
    } else if Path::new("schemagate.toml").exists() {
        Config::from_file(Path::new("schemagate.toml"))?
    } else {
        if cli.verbose {
            eprintln!("{}", "No config file found, using defaults".yellow());
        }
        Config::default()
    };

    let ok = match cli.command {
        Commands::CheckIdentifiers { output } => check_identifiers_command(&config, &output, cli.verbose)?,
        Commands::CheckLayout => check_layout_command(&config)?,
        Commands::ApplyMigrations => apply_migrations_command(&config).await?,
        Commands::RefreshFixtures { seed, rows } => refresh_fixtures_command(&config, seed, rows).await?,
        Commands::AddMeta => add_meta_command(&config)?,
    };

    if !ok {
        std::process::exit(1);
    }

    Ok(())
}

/// Log to stderr; `RUST_LOG` wins over `--verbose`
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn connection_settings(config: &Config) -> Result<ConnectionSettings> {
    ConnectionSettings::from_env(
        &config.database.url_env,
        &config.database.project_env,
        config.database.tls,
    )
    .map_err(|e| anyhow::anyhow!(e))
}

/// Check identifiers command - returns false when any identifier is invalid
fn check_identifiers_command(config: &Config, output: &Path, verbose: bool) -> Result<bool> {
    let root = config.schema_root();
    if verbose {
        eprintln!("{} {}", "Scanning schema files under:".cyan(), root.display());
    }

    let files = discover_schema_files(&root, &config.schema.schema_file)?;

    let validator = IdentifierValidator::new(Constructors::from(&config.schema));
    let report = match validator.validate(&files) {
        Ok(summary) => Report::from_diagnostics(Vec::new())
            .with_coverage(summary.files_checked, summary.sites_checked),
        Err(e) => Report::from_diagnostics(e.to_diagnostics()).with_coverage(files.len(), 0),
    };

    report
        .save_to_file(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    if verbose {
        eprintln!("{} {}", "Report saved to:".green(), output.display());
    }

    print_report_summary(&report);
    Ok(!report.has_errors())
}

/// Check layout command
fn check_layout_command(config: &Config) -> Result<bool> {
    match check_layout(&config.schema_root(), &config.schema) {
        Ok(modules) => {
            println!("{} {} schema modules", "✓".green(), modules.len());
            for module in &modules {
                println!("  - {}", module.name);
            }
            Ok(true)
        }
        Err(e) => {
            print_diagnostic(&e.to_diagnostic());
            Ok(false)
        }
    }
}

/// Apply migrations command
async fn apply_migrations_command(config: &Config) -> Result<bool> {
    let settings = connection_settings(config)?;
    let dir = config.migrations_dir();

    println!("{} {}", "Applying migrations from".cyan(), dir.display());

    let migrator = PostgresMigrator::connect(&settings)
        .await
        .context("Failed to connect for migrations")?;
    let applier = MigrationApplier::new(Arc::new(migrator));

    match applier.apply_all(&dir).await {
        Ok(summary) => {
            for name in &summary.applied {
                println!("  {} {}", "applied".green(), name);
            }
            println!(
                "{} {} applied, {} already up to date",
                "✓".green(),
                summary.applied.len(),
                summary.already_applied
            );
            Ok(true)
        }
        Err(e) => {
            print_diagnostic(&e.to_diagnostic());
            Ok(false)
        }
    }
}

/// Refresh fixtures command - false only when a table could not be cleared
async fn refresh_fixtures_command(config: &Config, seed: Option<u64>, rows: Option<usize>) -> Result<bool> {
    let reference = match &config.fixtures.reference_date {
        Some(value) => parse_reference_time(value)?,
        None => chrono::Utc::now()
            .date_naive()
            .and_time(chrono::NaiveTime::MIN)
            .and_utc(),
    };

    let mut options = FixtureOptions::new(reference);
    options.seed = seed.or(config.fixtures.seed);
    options.rows = rows.or(config.fixtures.rows);

    let settings = connection_settings(config)?;
    let store: Arc<dyn TableStore> = Arc::new(
        PostgresStore::connect(&settings)
            .await
            .context("Failed to connect for fixture refresh")?,
    );

    println!("{}", "Refreshing fixture data...".cyan());
    let reports = refresh_all(all_units(&options, store)).await;

    let mut ok = true;
    for report in &reports {
        match &report.result {
            Ok(RefreshOutcome::Refreshed { inserted, .. }) => {
                println!("  {} {} ({} rows)", "✓".green(), report.table, inserted);
            }
            Ok(RefreshOutcome::InsertFailed { reason, .. }) => {
                println!("  {} {}: {}", "⚠".yellow(), report.table, reason);
            }
            Err(e) => {
                println!("  {} {}: {}", "✗".red(), report.table, e);
                ok = false;
            }
        }
    }

    Ok(ok)
}

/// Add meta command
fn add_meta_command(config: &Config) -> Result<bool> {
    let path = config.snapshot_path();
    let added = ensure_snapshot_meta(&path)?;

    if added.is_empty() {
        println!("{} {} already has _meta", "✓".green(), path.display());
    } else {
        println!("{} Added {} to {}", "✓".green(), added.join(", "), path.display());
    }
    Ok(true)
}

fn print_diagnostic(diag: &Diagnostic) {
    let severity_str = match diag.severity {
        Severity::Error => "ERROR".red().bold(),
        Severity::Warn => "WARN".yellow().bold(),
        Severity::Info => "INFO".cyan(),
    };

    println!("  [{}] {}: {}", severity_str, diag.code, diag.message);

    if let Some(loc) = &diag.location {
        println!("    at {}", loc);
    }
    if let Some(exp) = &diag.expected {
        println!("    Column key:  {}", exp);
    }
    if let Some(act) = &diag.actual {
        println!("    Declared as: {}", act);
    }
}

const IDENTIFIER_CODES: [DiagnosticCode; 5] = [
    DiagnosticCode::IdentStartsWithDigit,
    DiagnosticCode::IdentIllegalCharacter,
    DiagnosticCode::IdentReservedWord,
    DiagnosticCode::ColumnKeyLiteralMismatch,
    DiagnosticCode::SchemaParseError,
];

/// Print report summary to stdout
fn print_report_summary(report: &Report) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "Identifier Check Report".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    println!("Version: {}", report.version);
    println!("Timestamp: {}", report.timestamp);
    println!();

    println!("{}", "Summary:".bold());
    println!("  Files checked:        {}", report.summary.files_checked);
    println!("  Declarations checked: {}", report.summary.declarations_checked);

    if report.summary.errors > 0 {
        println!("  Errors:   {}", format!("{}", report.summary.errors).red().bold());
        for code in IDENTIFIER_CODES {
            let count = report.count_of(code);
            if count > 0 {
                println!("    {:<28} {}", code.as_str(), count);
            }
        }
    } else {
        println!("  Errors:   {}", format!("{}", report.summary.errors).green());
    }
    println!();

    if report.diagnostics.is_empty() {
        println!("{}", "✓ All identifiers are safe!".green().bold());
    } else {
        println!("{}", "Diagnostics:".bold());
        for diag in &report.diagnostics {
            print_diagnostic(diag);
        }
    }

    println!();
    println!("{}", "=".repeat(60).bright_blue());
}
