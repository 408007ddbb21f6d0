//! Site-Indexer main entry point
//!
//! This is the command-line interface for the Site-Indexer crawler.

use anyhow::{bail, Context};
use clap::Parser;
use site_indexer::api::IndexingApi;
use site_indexer::config::{load_config_with_hash, Config};
use site_indexer::crawler::{HttpFetcher, Orchestrator};
use site_indexer::output::{load_statistics, print_statistics};
use site_indexer::storage::open_storage;
use site_indexer::url::SiteRoot;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Site-Indexer: crawls the configured sites into a page index
///
/// Every configured site is crawled from its root URL, staying within the
/// site. Each fetched page is stored along with its status code, and each
/// site ends the run as INDEXED or FAILED.
#[derive(Parser, Debug)]
#[command(name = "site-indexer")]
#[command(version)]
#[command(about = "Crawls configured sites into a page index", long_about = None)]
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

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_index(config).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("site_indexer=info,warn"),
            1 => EnvFilter::new("site_indexer=debug,info"),
            2 => EnvFilter::new("site_indexer=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== Site-Indexer Dry Run ===\n");

    println!("Crawler Configuration:");
    match config.crawler.page_ceiling() {
        Some(limit) => println!("  Max pages per site: {}", limit),
        None => println!("  Max pages per site: unlimited"),
    }
    println!(
        "  Concurrent sites: {}",
        config.crawler.site_pool_size(config.sites.len())
    );
    println!(
        "  Concurrent fetches per site: {}",
        config.crawler.max_concurrent_fetches
    );
    println!(
        "  Request timeout: {}s",
        config.crawler.request_timeout_secs
    );

    println!("\nUser Agent: {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    println!("\nSites ({}):", config.sites.len());
    for site in &config.sites {
        let root = SiteRoot::parse(&site.url)?;
        println!("  - {} ({})", site.name, root);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would index {} sites", config.sites.len());

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))
        .context("Failed to open database")?;
    let stats = load_statistics(&storage).context("Failed to load statistics")?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main indexing run
///
/// The run is started through the API surface, then awaited. Ctrl-C stops it;
/// fetches already in flight are allowed to drain before statistics are shown.
async fn handle_index(config: Config) -> anyhow::Result<()> {
    let storage = Arc::new(
        open_storage(Path::new(&config.output.database_path))
            .context("Failed to open database")?,
    );
    let fetcher = HttpFetcher::new(&config.user_agent, &config.crawler)
        .context("Failed to build HTTP client")?;

    let orchestrator = Orchestrator::new(&config, storage.clone(), Arc::new(fetcher));
    let api = IndexingApi::new(orchestrator.clone());

    let started = api.start_indexing();
    println!("{}", serde_json::to_string(&started)?);
    if !started.result {
        bail!(
            "Failed to start indexing: {}",
            started.error.unwrap_or_default()
        );
    }

    tokio::select! {
        _ = orchestrator.wait_until_idle() => {
            tracing::info!("Indexing completed");
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            tracing::warn!("Interrupted, stopping indexing");
            println!("{}", serde_json::to_string(&api.stop_indexing())?);
            orchestrator.wait_until_idle().await;
        }
    }

    let stats = load_statistics(&*storage).context("Failed to load statistics")?;
    print_statistics(&stats);

    Ok(())
}
