//! Catalog-Harvest main entry point
//!
//! This is the command-line interface for the resumable catalog crawler.

use anyhow::Context;
use catalog_harvest::config::{load_config_with_hash, Config, SeedConfig};
use catalog_harvest::crawler::crawl;
use catalog_harvest::crawler::export_dataset;
use catalog_harvest::output::{load_statistics, print_statistics};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Catalog-Harvest: a resumable product catalog crawler
///
/// Crawls the storefront's category listings and product pages, accumulates
/// the extracted products in a durable journal and writes them as a CSV
/// dataset. An interrupted run is resumed by running the same command again.
#[derive(Parser, Debug)]
#[command(name = "catalog-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A resumable product catalog crawler", long_about = None)]
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

    /// Validate config and show the crawl plan without touching the network
    #[arg(long, conflicts_with_all = ["stats", "export_only"])]
    dry_run: bool,

    /// Show statistics from the accumulator and listing ledger and exit
    #[arg(long, conflicts_with_all = ["dry_run", "export_only"])]
    stats: bool,

    /// Write the dataset from the current accumulator and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    export_only: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;
    tracing::info!(hash = %config_hash, "Configuration loaded");

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        let stats = load_statistics(&config.output).context("failed to read the stores")?;
        print_statistics(&stats);
    } else if cli.export_only {
        let rows = export_dataset(&config).context("failed to export the dataset")?;
        println!("Wrote {} rows to {}", rows, config.output.dataset_path);
    } else {
        let state = crawl(config).await.context("crawl aborted")?;
        println!(
            "Crawl finished: {} items recorded, {} failed, {} rows in dataset",
            state.items_processed, state.items_failed, state.records_materialized
        );
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
            0 => EnvFilter::new("catalog_harvest=info,warn"),
            1 => EnvFilter::new("catalog_harvest=debug,info"),
            2 => EnvFilter::new("catalog_harvest=trace,debug"),
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

/// Handles the --dry-run mode: shows the resolved crawl plan
fn handle_dry_run(config: &Config) {
    println!("=== Catalog-Harvest Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Base URL: {}", config.crawler.base_url);
    println!("  Launch spacing: {}ms", config.crawler.launch_spacing_ms);
    println!("  Page size: {}", config.crawler.page_size);
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);
    println!("  Connect timeout: {}s", config.crawler.connect_timeout_secs);
    println!(
        "  Reuse discovered listings: {}",
        config.crawler.reuse_discovered_listings
    );

    println!("\nSeed ({}):", config.seed.strategy_name());
    match &config.seed {
        SeedConfig::Sitemap { sitemap_url } => println!("  Sitemap: {}", sitemap_url),
        SeedConfig::Categories { categories } => {
            for category in categories {
                println!("  - {}", category);
            }
        }
        SeedConfig::PageRange {
            listing_url,
            first_page,
            last_page,
        } => println!("  {} pages {}..={}", listing_url, first_page, last_page),
    }

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nExtraction:");
    println!("  Supplier: {}", config.extraction.supplier_name);

    println!("\nOutput:");
    for (name, path) in config.output.paths() {
        println!("  {}: {}", name, path);
    }

    println!("\nConfiguration is valid.");
}
