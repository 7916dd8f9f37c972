//! Sumi-Harvest main entry point
//!
//! This is the command-line interface for the Sumi-Harvest forum release harvester.

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use sumi_harvest::catalog::{load_statistics, print_statistics, search};
use sumi_harvest::config::{load_config_with_hash, Config};
use sumi_harvest::events::TracingSink;
use sumi_harvest::storage::{open_store, MemoryStore, Store};
use sumi_harvest::{parse_title, Harvester};
use tracing_subscriber::EnvFilter;

/// Sumi-Harvest: a forum release harvester
///
/// Sumi-Harvest crawls a torrent-release forum, parses release titles into
/// structured metadata and groups the releases into a show/season catalog.
#[derive(Parser, Debug)]
#[command(name = "sumi-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A forum release harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Run the startup harvest once and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats", "parse_title", "search"])]
    once: bool,

    /// Harvest once into an in-memory catalog and print what would be stored
    #[arg(long, conflicts_with_all = ["once", "stats", "parse_title", "search"])]
    dry_run: bool,

    /// Show catalog statistics and exit
    #[arg(long, conflicts_with_all = ["once", "dry_run", "parse_title", "search"])]
    stats: bool,

    /// Parse a release title, print the result and exit
    #[arg(long, value_name = "TEXT", conflicts_with_all = ["once", "dry_run", "stats", "search"])]
    parse_title: Option<String>,

    /// Search the catalog for a show and exit
    #[arg(long, value_name = "QUERY", conflicts_with_all = ["once", "dry_run", "stats", "parse_title"])]
    search: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    if let Some(text) = &cli.parse_title {
        handle_parse_title(text);
        return Ok(());
    }

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if cli.stats {
        handle_stats(&config)?;
    } else if let Some(query) = &cli.search {
        handle_search(&config, query)?;
    } else if cli.dry_run {
        handle_dry_run(config).await?;
    } else {
        handle_harvest(config, cli.once).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_harvest=info,warn"),
            1 => EnvFilter::new("sumi_harvest=debug,info"),
            2 => EnvFilter::new("sumi_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles --parse-title: prints the parsed metadata
fn handle_parse_title(text: &str) {
    let parsed = parse_title(text);

    println!("Base show name: {}", parsed.base_show_name);
    println!("Display title:  {}", parsed.canonical_display_title);
    println!("Catalog title:  {}", parsed.catalog_title());
    if let Some(year) = parsed.year {
        println!("Year:           {}", year);
    }
    println!("Season:         {}", parsed.season);
    if let (Some(start), Some(end)) = (parsed.episode_start, parsed.episode_end) {
        println!("Episodes:       {}-{}", start, end);
    }
    println!("Resolutions:    {:?}", parsed.resolutions);
    println!("Quality:        {:?}", parsed.quality_tags);
    println!("Codecs:         {:?}", parsed.codecs);
    println!("Audio:          {:?}", parsed.audio_codecs);
    println!("Languages:      {:?}", parsed.languages);
    println!("Sizes:          {:?}", parsed.sizes);
    println!("Subtitles:      {}", parsed.has_subtitles);
    if parsed.used_fallback {
        println!("(show name could not be isolated; raw title used)");
    }
}

/// Handles --stats: shows statistics from the catalog
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.storage.database_path);

    let store = open_store(Path::new(&config.storage.database_path))?;
    let stats = load_statistics(&store)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles --search: fuzzy search over show groups
fn handle_search(config: &Config, query: &str) -> anyhow::Result<()> {
    let store = open_store(Path::new(&config.storage.database_path))?;
    let hits = search(&store, query, config.matching.search_threshold)?;

    if hits.is_empty() {
        println!("No shows match \"{}\"", query);
        return Ok(());
    }
    for hit in hits {
        println!(
            "{:.3}  {}  [{}]",
            hit.score, hit.group.display_title, hit.group.group_id
        );
    }

    Ok(())
}

/// Handles --dry-run: harvests once into memory and prints the catalog
async fn handle_dry_run(config: Config) -> anyhow::Result<()> {
    println!("=== Sumi-Harvest Dry Run ===\n");
    println!("Forum: {}", config.forum.base_url);
    println!("Initial pages: {}", config.crawl.initial_pages);
    println!("Max concurrency: {}\n", config.crawl.max_concurrency);

    let store = Arc::new(MemoryStore::new());
    let harvester = Harvester::new(config, store.clone(), Arc::new(TracingSink))?;
    let report = harvester.startup().await;

    println!(
        "Would store {} threads ({} failed)\n",
        report.threads_saved, report.threads_failed
    );
    print_statistics(&load_statistics(&*store)?);

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(config: Config, once: bool) -> anyhow::Result<()> {
    let store = open_store(Path::new(&config.storage.database_path))?;
    if config.storage.purge_on_start {
        tracing::warn!("Purging catalog at {}", config.storage.database_path);
        store.clear()?;
    }

    let store: Arc<dyn Store> = Arc::new(store);
    let harvester = Arc::new(Harvester::new(config, store, Arc::new(TracingSink))?);

    if once {
        let report = harvester.startup().await;
        tracing::info!(
            "Harvest completed: {} threads saved, {} failed",
            report.threads_saved,
            report.threads_failed
        );
        return Ok(());
    }

    harvester
        .run_forever(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await;

    tracing::info!("Harvester stopped");
    Ok(())
}
