use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use commit_scraper::config::{Config, StoreBackend};
use commit_scraper::error::{ScraperError, ValidationError};
use commit_scraper::scraper::{RunOptions, Scraper};
use commit_scraper::sources::{dedup_preserving_order, expand_list_arg, parse_sources};
use commit_scraper::types::CommitRecord;
use std::path::PathBuf;
use std::process::ExitCode;

/// Exit status for bad input or configuration
const USAGE_EXIT_CODE: u8 = 2;

#[derive(Parser)]
#[command(name = "commit-scraper")]
#[command(about = "Mine line-level change records from git commit history")]
#[command(version, long_version = env!("SCRAPER_LONG_VERSION"))]
struct Cli {
    /// Log per-commit detail
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape repositories into the commit record store
    Scrape(ScrapeArgs),
    /// Print the JSON Schema of a commit record
    Schema,
}

#[derive(clap::Args)]
struct ScrapeArgs {
    /// `;`-separated local repository paths (or files listing them), each
    /// optionally followed by `?path=..&label=..&since=..&until=..`
    #[arg(short, long)]
    sources: String,

    /// `;`-separated paths to process in every repository
    #[arg(long)]
    paths: Option<String>,

    /// `;`-separated labels applied to every record
    #[arg(long)]
    labels: Option<String>,

    /// Only commits at or after this time
    #[arg(long)]
    since: Option<String>,

    /// Only commits at or before this time
    #[arg(long)]
    until: Option<String>,

    /// Replace identifying fields with salted digests
    #[arg(short, long)]
    anonymize: bool,

    /// Store file to read and extend
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Store backend
    #[arg(long, value_enum)]
    backend: Option<StoreBackend>,

    /// SQLite table or JSON collection name
    #[arg(long)]
    table: Option<String>,

    /// Configuration file (defaults to the platform config directory)
    #[arg(long, env = "COMMIT_SCRAPER_CONFIG")]
    config: Option<PathBuf>,
}

fn scrape(args: ScrapeArgs) -> commit_scraper::error::Result<()> {
    let mut config = Config::new(args.config.as_deref())?;

    // CLI flags take priority over environment and file
    if let Some(output) = args.output {
        config.store.path = Some(output);
    }
    if let Some(backend) = args.backend {
        config.store.backend = backend;
    }
    if let Some(table) = args.table {
        config.store.table = table;
    }
    if args.since.is_some() {
        config.extraction.since = args.since;
    }
    if args.until.is_some() {
        config.extraction.until = args.until;
    }
    if args.anonymize {
        config.extraction.anonymize = true;
    }
    config.validate()?;

    let sources = parse_sources(&args.sources);
    if sources.is_empty() {
        return Err(ScraperError::from(ValidationError::NoSources));
    }

    let cli_paths = args.paths.as_deref().map(expand_list_arg).unwrap_or_default();
    let cli_labels = args.labels.as_deref().map(expand_list_arg).unwrap_or_default();

    let options = RunOptions {
        sources,
        paths: dedup_preserving_order(config.extraction.paths.iter().cloned().chain(cli_paths)),
        labels: dedup_preserving_order(config.extraction.labels.iter().cloned().chain(cli_labels)),
        time_range: config.time_range()?,
        anonymize: config.extraction.anonymize,
    };

    tracing::info!(
        "Scraping {} repositories ({} to {}), anonymize: {}",
        options.sources.len(),
        options.time_range.git_since(),
        options.time_range.git_until(),
        options.anonymize
    );

    let summary = Scraper::from_config(&config).run(&options)?;
    println!("{}", summary);
    Ok(())
}

fn print_schema() -> Result<()> {
    let schema = schemars::schema_for!(CommitRecord);
    let json = serde_json::to_string_pretty(&schema).context("Failed to serialize schema")?;
    println!("{}", json);
    Ok(())
}

/// Log a failed command and map it to an exit status
fn report(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<ScraperError>() {
        Some(e) if e.is_user_error() => {
            tracing::error!("{}", e);
            ExitCode::from(USAGE_EXIT_CODE)
        }
        Some(e) if e.is_run_fatal() => {
            tracing::error!("Run aborted: {}", e);
            ExitCode::FAILURE
        }
        _ => {
            tracing::error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries only the summary or schema
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    let result = match cli.command {
        Commands::Scrape(args) => scrape(args).map_err(anyhow::Error::from),
        Commands::Schema => print_schema(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(&e),
    }
}
