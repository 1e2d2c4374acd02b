use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use schemata_core::{Config, IssueParent, Schema, ValidationReport};
use schemata_engine::{load_and_hydrate, ContextTypes, GraphQlTypes, SchemaDiff, SchemaMap, BUNDLE_NAME};

/// Schemata - validate, diff and generate from XML schema definitions
#[derive(Parser)]
#[command(name = "schemata")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: schemata.toml in or next to the schema directory)
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
    /// Validate naming conventions and list tracked issues
    Validate {
        /// Schema directory
        schema: PathBuf,

        /// Output file for the JSON validation report
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Only report on this table
        #[arg(short, long)]
        table: Option<String>,
    },

    /// Show structural changes between two schema directories
    Diff {
        /// Old schema directory
        old: PathBuf,

        /// New schema directory
        new: PathBuf,
    },

    /// Generate GraphQL type definitions
    Graphql {
        /// Schema directory
        schema: PathBuf,

        /// Output directory
        output: PathBuf,

        /// Write a single schema.graphql
        #[arg(short, long)]
        bundle: bool,
    },

    /// Generate the JSON data-context mapping
    Context {
        /// Schema directory
        schema: PathBuf,

        /// Output directory
        output: PathBuf,

        /// Write a single schema.json
        #[arg(short, long)]
        bundle: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    match cli.command {
        Commands::Validate { schema, output, table } => {
            let config = load_config(cli.config.as_deref(), &schema, cli.verbose)?;
            validate_command(&config, &schema, output.as_deref(), table.as_deref(), cli.verbose)
        }
        Commands::Diff { old, new } => {
            let old_config = load_config(cli.config.as_deref(), &old, cli.verbose)?;
            let new_config = load_config(cli.config.as_deref(), &new, cli.verbose)?;
            diff_command(&old_config, &old, &new_config, &new)
        }
        Commands::Graphql { schema, output, bundle } => {
            let config = generator_config(cli.config.as_deref(), &schema, cli.verbose)?;
            graphql_command(&config, &schema, &output, bundle, cli.verbose)
        }
        Commands::Context { schema, output, bundle } => {
            let config = generator_config(cli.config.as_deref(), &schema, cli.verbose)?;
            context_command(&config, &schema, &output, bundle, cli.verbose)
        }
    }
}

/// Explicit `--config`, else `schemata.toml` discovered around the schema directory
fn load_config(explicit: Option<&Path>, schema_dir: &Path, verbose: bool) -> Result<Config> {
    let config = match explicit {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::discover(schema_dir)
            .with_context(|| format!("Failed to load config for {}", schema_dir.display()))?,
    };

    if verbose {
        eprintln!(
            "{} {} whitelisted aliases, {} property definitions",
            "Using".cyan(),
            config.alias_whitelist().len(),
            config.properties.len()
        );
    }

    Ok(config)
}

/// Generators always see codelists as tables
fn generator_config(explicit: Option<&Path>, schema_dir: &Path, verbose: bool) -> Result<Config> {
    let mut config = load_config(explicit, schema_dir, verbose)?;
    config.codelists_as_tables = true;
    Ok(config)
}

fn hydrate_dir(config: &Config, schema_dir: &Path, verbose: bool) -> Result<Schema> {
    if verbose {
        eprintln!("{} {}", "Loading schema from:".cyan(), schema_dir.display());
    }

    let schema = load_and_hydrate(schema_dir, config)
        .with_context(|| format!("Failed to load schema from {}", schema_dir.display()))?;

    if verbose {
        eprintln!(
            "Loaded {} tables and {} codelists",
            schema.table_count(),
            schema.codelist_count()
        );
    }

    Ok(schema)
}

/// Validate command - exits with 1 when any table has violations or issues
fn validate_command(
    config: &Config,
    schema_dir: &Path,
    output: Option<&Path>,
    table: Option<&str>,
    verbose: bool,
) -> Result<()> {
    let schema = hydrate_dir(config, schema_dir, verbose)?;
    let report = build_report(&schema, table)?;

    if let Some(path) = output {
        report
            .save_to_file(path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        if verbose {
            eprintln!("{} {}", "Report saved to:".green(), path.display());
        }
    }

    print_report_summary(&report);

    if report.has_issues() {
        std::process::exit(1);
    }

    Ok(())
}

fn build_report(schema: &Schema, table: Option<&str>) -> Result<ValidationReport> {
    match table {
        Some(name) => Ok(ValidationReport::for_table(schema, name)?),
        None => Ok(ValidationReport::from_schema(schema)),
    }
}

fn diff_command(old_config: &Config, old_dir: &Path, new_config: &Config, new_dir: &Path) -> Result<()> {
    let mut old = hydrate_dir(old_config, old_dir, false)?;
    let mut new = hydrate_dir(new_config, new_dir, false)?;
    old.clean_up_for_diff();
    new.clean_up_for_diff();

    let diff = SchemaDiff::compare(&old, &new);

    if diff.is_empty() {
        println!("{}", "✓ No differences found".green().bold());
        return Ok(());
    }

    println!("{}", SchemaDiff::LEGEND.dimmed());
    println!();
    for line in diff.lines() {
        println!("{}", line);
    }

    Ok(())
}

fn graphql_command(config: &Config, schema_dir: &Path, output: &Path, bundle: bool, verbose: bool) -> Result<()> {
    let schema = hydrate_dir(config, schema_dir, verbose)?;
    let map = SchemaMap::build(&schema, &GraphQlTypes)?;

    prepare_output_dir(output, "graphql")?;
    let files = map.to_graphql_sdl(bundle);
    for (name, contents) in &files {
        write_output(output, name, "graphql", contents)?;
    }

    println!("{} {} file(s) to {}", "Generated".green(), files.len(), output.display());
    Ok(())
}

fn context_command(config: &Config, schema_dir: &Path, output: &Path, bundle: bool, verbose: bool) -> Result<()> {
    let schema = hydrate_dir(config, schema_dir, verbose)?;
    let map = SchemaMap::build(&schema, &ContextTypes)?;

    prepare_output_dir(output, "json")?;
    let mut written = 0;
    if bundle {
        write_output(output, BUNDLE_NAME, "json", &serde_json::to_string_pretty(&map)?)?;
        written += 1;
    } else {
        for (name, entity) in &map.types {
            write_output(output, name, "json", &serde_json::to_string_pretty(entity)?)?;
            written += 1;
        }
    }

    println!("{} {} file(s) to {}", "Generated".green(), written, output.display());
    Ok(())
}

/// Create the output directory and drop files a previous run left behind
fn prepare_output_dir(dir: &Path, extension: &str) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some(extension) {
            tracing::debug!(path = %path.display(), "removing obsolete output");
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
        }
    }

    Ok(())
}

fn write_output(dir: &Path, name: &str, extension: &str, contents: &str) -> Result<()> {
    let path = dir.join(format!("{}.{}", name, extension));
    std::fs::write(&path, contents).with_context(|| format!("Failed to write {}", path.display()))
}

fn print_report_summary(report: &ValidationReport) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "Schema Validation Report".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    println!("Version: {}", report.version);
    println!("Timestamp: {}", report.timestamp);
    println!();

    println!("{}", "Summary:".bold());
    println!("  Tables:    {}", report.summary.tables);
    println!("  Codelists: {}", report.summary.codelists);

    if report.summary.violations > 0 {
        println!("  Violations:    {}", format!("{}", report.summary.violations).red().bold());
    } else {
        println!("  Violations:    {}", format!("{}", report.summary.violations).green());
    }

    if report.summary.open_issues > 0 {
        println!("  Open issues:   {}", format!("{}", report.summary.open_issues).yellow());
    } else {
        println!("  Open issues:   {}", format!("{}", report.summary.open_issues).green());
    }

    println!("  Closed issues: {}", report.summary.closed_issues);
    println!();

    if !report.has_issues() {
        println!("{}", "✓ No issues found!".green().bold());
        return;
    }

    println!("{}", "Tables with issues:".bold());
    for table in &report.tables {
        println!("  {}", table.name.bold());

        for violation in &table.violations {
            println!("    [{}] {}", violation.code.to_string().red(), violation.message);
        }

        for (column, violations) in &table.column_violations {
            for violation in violations {
                println!("    [{}] {}: {}", violation.code.to_string().red(), column, violation.message);
            }
        }

        for issue in &table.issues {
            let status = if issue.is_open() {
                issue.status.to_string().yellow()
            } else {
                issue.status.to_string().dimmed()
            };
            let location = match &issue.parent {
                IssueParent::Table { .. } => String::new(),
                IssueParent::Column { column, .. } => format!("{}: ", column),
            };
            println!("    [{}] {}{} ({} notes)", status, location, issue.issue_type, issue.notes.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses() {
        let cli = Cli::try_parse_from(["schemata", "--verbose", "graphql", "schema", "out", "--bundle"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Graphql { bundle: true, .. }));

        let cli = Cli::try_parse_from(["schemata", "diff", "a", "b", "--config", "x.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
    }

    #[test]
    fn report_for_unknown_table_fails() {
        let mut schema = Schema::new();
        schema.add_table(schemata_core::Table::new("users")).unwrap();

        assert!(build_report(&schema, Some("users")).is_ok());
        let err = build_report(&schema, Some("orders")).unwrap_err();
        assert!(err.to_string().contains("orders"));

        let cli = Cli::try_parse_from(["schemata", "validate", "schema", "--table", "users"]).unwrap();
        assert!(matches!(cli.command, Commands::Validate { table: Some(_), .. }));
    }

    #[test]
    fn obsolete_outputs_removed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("old.graphql"), "type old {}").unwrap();
        std::fs::write(dir.path().join("keep.json"), "{}").unwrap();

        prepare_output_dir(dir.path(), "graphql").unwrap();

        assert!(!dir.path().join("old.graphql").exists());
        assert!(dir.path().join("keep.json").exists());
    }

    #[test]
    fn generator_forces_codelist_tables() {
        let dir = tempfile::tempdir().unwrap();
        let config = generator_config(None, dir.path(), false).unwrap();
        assert!(config.codelists_as_tables);
    }
}
