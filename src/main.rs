//! Matchweek main entry point
//!
//! This is the command-line interface for the weekly results collector.

use anyhow::Context;
use clap::Parser;
use matchweek::config::{load_config_with_hash, Config, TransportKind};
use matchweek::fetch::crawler_user_agent;
use matchweek::run::print_report;
use matchweek::RunCoordinator;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Matchweek: a polite weekly results collector
///
/// Fetches the fixtures listing (cached and rate limited), finds the latest
/// completed matchweek, scores every match report with an external program,
/// and combines the results into one CSV file.
#[derive(Parser, Debug)]
#[command(name = "matchweek")]
#[command(version = "1.0.0")]
#[command(about = "A polite weekly results collector", long_about = None)]
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

    /// Validate config and show what would be fetched without fetching
    #[arg(long)]
    dry_run: bool,

    /// Ignore the cached listing page and fetch it again
    #[arg(long)]
    no_cache: bool,

    /// Process this matchweek instead of the latest completed one
    #[arg(long, value_name = "N")]
    week: Option<u32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config, cli.no_cache, cli.week);
        return Ok(());
    }

    let mut coordinator = RunCoordinator::from_config(&config, cli.no_cache)
        .context("Failed to set up the pipeline")?;
    tracing::info!(
        transport = coordinator.engine().transport_name(),
        source = %config.source.url,
        "Pipeline ready"
    );

    let report = coordinator.run(cli.week).await?;

    if !cli.quiet {
        println!();
        print_report(&report);
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("matchweek=info,warn"),
            1 => EnvFilter::new("matchweek=debug,info"),
            2 => EnvFilter::new("matchweek=trace,debug"),
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

/// Handles the --dry-run mode: shows the resolved configuration
fn handle_dry_run(config: &Config, no_cache: bool, week: Option<u32>) {
    println!("=== Matchweek Dry Run ===\n");

    println!("Source:");
    println!("  URL: {}", config.source.url);
    println!(
        "  Expected marker: {}",
        config.source.expected_marker
    );

    println!("\nFetch:");
    match config.fetch.transport {
        TransportKind::Direct => println!("  Transport: direct"),
        TransportKind::ScrapeApi => {
            let key_state = if std::env::var(&config.scrape_api.key_env)
                .map(|k| !k.trim().is_empty())
                .unwrap_or(false)
            {
                "set"
            } else {
                "NOT SET"
            };
            println!("  Transport: scrape-api ({})", config.scrape_api.endpoint);
            println!("  Credential: {} ({})", config.scrape_api.key_env, key_state);
        }
    }
    println!("  Max attempts: {}", config.fetch.max_attempts);
    println!("  Backoff base: {}ms", config.fetch.backoff_base_ms);
    if no_cache {
        println!("  Cache max age: 0s (--no-cache)");
    } else {
        println!("  Cache max age: {}s", config.fetch.cache_max_age_secs);
    }
    println!("  Respect robots.txt: {}", config.fetch.respect_robots);

    println!("\nThrottle:");
    println!(
        "  {} requests per {}s (+{}ms guard)",
        config.throttle.max_requests, config.throttle.window_secs, config.throttle.guard_ms
    );

    println!("\nCache:");
    println!("  Backend: {:?}", config.cache.backend);
    println!("  Path: {}", config.cache.path);

    println!("\nUser Agent:");
    println!("  Profile: {:?}", config.user_agent.profile);
    println!("  Crawler string: {}", crawler_user_agent(&config.user_agent));

    println!("\nScorer:");
    println!(
        "  Command: {} {} <link> <destination>",
        config.scorer.program,
        config.scorer.args.join(" ")
    );
    println!("  Working dir: {}", config.scorer.working_dir);
    println!("  Item outputs: {}", config.scorer.output_dir);
    println!("  On failure: {:?}", config.scorer.on_failure);

    println!("\nOutput:");
    let week_label = week.map_or_else(|| "<week>".to_string(), |w| w.to_string());
    println!(
        "  Artifact: {}/{}{}.csv",
        config.output.directory, config.output.file_prefix, week_label
    );

    println!("\nConfiguration is valid. Remove --dry-run to run.");
}
