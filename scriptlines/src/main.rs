//! scriptlines - CLI tool to extract script dialogue into the database
//!
//! Walks one or more folders of plain-text scripts, recovers the speaking
//! characters and their lines, and stores them in SQLite.
//!
//! Uses XDG Base Directory specification for file locations:
//! - Database: $XDG_DATA_HOME/scriptlines/scripts.sqlite3
//! - Logs: $XDG_STATE_HOME/scriptlines/scriptlines.log.<date>
//! - Config: $XDG_CONFIG_HOME/scriptlines/config.toml

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use indicatif::{ProgressBar, ProgressStyle};
use scriptlines_core::ingest::{discover, CollectionResult};
use scriptlines_core::{Collection, Config, Database, IngestCoordinator, IngestReport};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "scriptlines")]
#[command(about = "Extract episodes, characters and lines from TV scripts")]
#[command(version)]
struct Args {
    /// Collections to ingest as SHOW=DIR or DIR (show taken from the folder
    /// name); defaults to the collections in the config file
    collections: Vec<Collection>,

    /// Config file (defaults to $XDG_CONFIG_HOME/scriptlines/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// SQLite database file
    #[arg(long)]
    database: Option<PathBuf>,

    /// Verbose output (-v empty line ids, -vv skipped files)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Dry run - discover files but don't parse or store
    #[arg(long)]
    dry_run: bool,

    /// Store lines again for episodes already in the database
    #[arg(long)]
    reingest: bool,

    /// Print the ingest report as JSON
    #[arg(long)]
    json: bool,

    /// Print database totals and top speakers afterwards
    #[arg(long)]
    stats: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("failed to load configuration")?;

    let _log_guard = scriptlines_core::logging::init(&config.logging)
        .context("failed to initialize logging")?;

    tracing::info!(
        log_file = %scriptlines_core::logging::log_file_path().display(),
        "scriptlines starting"
    );

    let collections = if args.collections.is_empty() {
        config
            .collections
            .iter()
            .map(Collection::from_config)
            .collect::<scriptlines_core::Result<Vec<_>>>()
            .context("invalid collection in configuration")?
    } else {
        args.collections.clone()
    };

    if args.dry_run {
        return run_dry(&collections);
    }

    let db_path = args
        .database
        .clone()
        .unwrap_or_else(|| config.resolved_database_path());
    tracing::info!(path = %db_path.display(), "Opening database");

    let mut db = Database::open(&db_path).context("failed to open database")?;
    db.init_schema().context("failed to create database schema")?;

    if !args.json {
        println!("Database: {}", db_path.display());
    }

    let coordinator = IngestCoordinator::from_config(&config)
        .context("failed to compile line patterns")?
        .with_reingest(args.reingest || config.ingest.reingest);

    let mut report = IngestReport::default();
    for collection in &collections {
        if !args.json {
            println!("\nProcessing: {}", collection.folder.display());
        }
        let result = ingest_with_progress(&coordinator, &mut db, collection, args.json)
            .with_context(|| format!("failed to ingest {}", collection.folder.display()))?;
        if !args.json {
            print_collection_result(&result, args.verbose);
        }
        report.collections.push(result);
    }

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("failed to serialize report")?
        );
    }

    if args.stats {
        print_stats(&db)?;
    }

    tracing::info!(
        files_processed = report.files_processed(),
        lines_recorded = report.lines_recorded(),
        empty_lines = report.empty_lines(),
        "scriptlines complete"
    );

    Ok(())
}

/// List what would be ingested without touching the database
fn run_dry(collections: &[Collection]) -> Result<()> {
    for collection in collections {
        let files = discover(&collection.folder, &collection.pattern)
            .with_context(|| format!("failed to list {}", collection.folder.display()))?;
        println!(
            "  - {}: {} file(s) at {}",
            collection.show,
            files.len(),
            collection.folder.display()
        );
    }
    println!("\nDry run - nothing ingested");
    tracing::info!("Dry run complete");
    Ok(())
}

/// Ingest one collection behind a progress bar
fn ingest_with_progress(
    coordinator: &IngestCoordinator,
    db: &mut Database,
    collection: &Collection,
    quiet: bool,
) -> Result<CollectionResult> {
    let pb = if quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(0)
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .context("invalid progress template")?
            .progress_chars("#>-"),
    );

    let result = coordinator.ingest_collection_with_progress(db, collection, |current, total, path| {
        if current == 0 {
            pb.set_length(total as u64);
        }
        pb.set_position(current as u64);
        pb.set_message(
            path.file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("...")
                .to_string(),
        );
    });

    pb.finish_and_clear();
    Ok(result?)
}

fn print_collection_result(result: &CollectionResult, verbose: u8) {
    if verbose >= 1 {
        for id in &result.empty_line_ids {
            println!("Empty line id: {}", id);
        }
    }
    if verbose >= 2 {
        for (path, reason) in &result.skipped {
            println!("Skipped {}: {}", path.display(), reason);
        }
    }

    println!(
        "{} ({}): {} file(s), {} line(s), {} skipped",
        result.show.display_name(),
        result.show,
        result.files_processed,
        result.lines_recorded,
        result.skipped.len()
    );
    println!("Processing time: {:.2?}", result.elapsed);
    println!(
        "Total empty lines in {}: {}",
        result.folder.display(),
        result.empty_lines()
    );
}

fn print_stats(db: &Database) -> Result<()> {
    let counts = db.get_total_counts().context("failed to count rows")?;
    println!(
        "\nDatabase totals: {} episode(s), {} character(s), {} line(s)",
        counts.episodes, counts.characters, counts.lines
    );

    let top = db
        .top_characters(10)
        .context("failed to query top characters")?;
    if !top.is_empty() {
        println!("Most lines:");
        for (name, count) in top {
            println!("  {:<20} {}", name, count);
        }
    }
    Ok(())
}
