//! web-fetcher main entry point
//!
//! This is the command-line interface for the web-fetcher site crawler.

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use web_fetcher::config::{load_config_with_hash, Config};
use web_fetcher::crawler::{run_crawl, HttpFetcher, RunSettings};
use web_fetcher::output::{print_summary, JsonLinesSink, RecordSink};
use web_fetcher::storage::{run_id_for, JsonRunStateStore, RunStateStore};

/// web-fetcher: a recursive, bounded site crawler
///
/// web-fetcher crawls each configured site from its seed URL while respecting
/// robots.txt, writes one JSON record per fetched page, and reports pages that
/// disappeared since the previous run as deletions.
#[derive(Parser, Debug)]
#[command(name = "web-fetcher")]
#[command(version = "1.0.0")]
#[command(about = "A recursive, bounded site crawler", long_about = None)]
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

    /// Forget the previous run of each site before crawling (no deletions)
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    fresh: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with_all = ["fresh", "stats"])]
    dry_run: bool,

    /// Show the saved state of each site and exit
    #[arg(long, conflicts_with_all = ["fresh", "dry_run"])]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(&config, cli.fresh).await?;
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
            0 => EnvFilter::new("web_fetcher=info,warn"),
            1 => EnvFilter::new("web_fetcher=debug,info"),
            2 => EnvFilter::new("web_fetcher=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    // Records may go to stdout, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) {
    println!("=== web-fetcher Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Threads: {}", config.crawler.threads);
    println!("  Max depth: {}", limit(u64::from(config.crawler.max_depth)));
    println!("  Max pages: {}", limit(config.crawler.max_pages));
    println!("  Read robots.txt: {}", config.crawler.read_robots);
    println!("  JavaScript rendering: {}", config.crawler.javascript);
    println!("  Excluded data patterns: {}", config.crawler.exclude_data.len());
    println!("  Excluded link patterns: {}", config.crawler.exclude_link.len());

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_user_agent);
    if let Some(referer) = &config.user_agent.crawler_referer {
        println!("  Referer: {}", referer);
    }

    println!("\nTransport:");
    println!("  Timeout: {}ms", config.transport.timeout_ms);
    println!("  Proxy: {}", config.transport.proxy.as_deref().unwrap_or("none"));
    println!("  SSL check: {}", config.transport.ssl_check);

    println!("\nOutput:");
    println!(
        "  Data folder: {}",
        config
            .output
            .data_folder
            .as_deref()
            .unwrap_or("none (deletions disabled)")
    );
    println!(
        "  Records: {}",
        config.output.records_path.as_deref().unwrap_or("stdout")
    );

    println!("\nSites ({}):", config.site.len());
    for (index, site) in config.site.iter().enumerate() {
        let settings = RunSettings::from_config(config, site, index);
        println!("  - {} ({})", settings.seed_url, settings.thread_id);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would start crawling {} sites", config.site.len());
}

fn limit(value: u64) -> String {
    if value == 0 {
        "unlimited".to_string()
    } else {
        value.to_string()
    }
}

/// Handles the --stats mode: shows the saved state of each site
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let Some(data_folder) = config.output.data_folder.as_deref() else {
        println!("No data folder configured, nothing is saved between runs");
        return Ok(());
    };

    println!("Data folder: {}\n", data_folder);
    let store = JsonRunStateStore::new(Path::new(data_folder));

    for (index, site) in config.site.iter().enumerate() {
        let settings = RunSettings::from_config(config, site, index);
        let run_id = run_id_for(&settings.seed_url);

        match store.load(&run_id)? {
            Some(urls) => println!(
                "  {} ({}): {} URLs from last run",
                settings.seed_url,
                settings.thread_id,
                urls.len()
            ),
            None => println!(
                "  {} ({}): no previous run",
                settings.seed_url, settings.thread_id
            ),
        }
    }

    Ok(())
}

/// Handles the main crawl operation
///
/// Sites are crawled one after another, each with its own transport.
async fn handle_crawl(config: &Config, fresh: bool) -> anyhow::Result<()> {
    let records_path = config.output.records_path.as_deref().filter(|p| !p.is_empty());
    let sink = Arc::new(match records_path {
        Some(path) => JsonLinesSink::to_file(Path::new(path))
            .with_context(|| format!("Failed to open records file {}", path))?,
        None => JsonLinesSink::to_stdout(),
    });

    tracing::info!("Sites to crawl: {}", config.site.len());

    for (index, site) in config.site.iter().enumerate() {
        let settings = RunSettings::from_config(config, site, index);

        if fresh {
            forget_previous_run(&settings)?;
        }

        let fetcher = HttpFetcher::new(&config.user_agent, &config.transport)
            .context("Failed to build HTTP transport")?;

        let summary = run_crawl(
            settings,
            Arc::new(fetcher),
            Arc::clone(&sink) as Arc<dyn RecordSink>,
        )
        .await
        .with_context(|| format!("Crawl of {} failed", site.url))?;

        sink.flush()?;

        // Stdout carries the records themselves when no file is configured
        if records_path.is_some() {
            print_summary(&summary);
        } else {
            tracing::info!(?summary, "Run summary");
        }
    }

    tracing::info!("Crawl completed successfully");
    Ok(())
}

/// Removes the saved state of a site so its next run reports no deletions
fn forget_previous_run(settings: &RunSettings) -> anyhow::Result<()> {
    if let Some(data_folder) = &settings.data_folder {
        let store = JsonRunStateStore::new(data_folder);
        if store.clear(&run_id_for(&settings.seed_url))? {
            tracing::info!(
                thread_id = %settings.thread_id,
                "Forgot previous run state (fresh crawl)"
            );
        }
    }
    Ok(())
}
