//! Customer Scout main entry point
//!
//! This is the command-line interface for running one discovery job.

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use customer_scout::config::{load_config_with_hash, validate, Config};
use customer_scout::jobs::{JobId, JobReport, JobService};
use customer_scout::output::{format_markdown_report, print_statistics, write_markdown_report};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// How often the CLI polls the running job
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Customer Scout: find out who buys from a software vendor
///
/// Collects customer references from the vendor's site, customer
/// directories, search engines and review sites, validates and
/// deduplicates them, and prints the resulting customer table.
#[derive(Parser, Debug)]
#[command(name = "customer-scout")]
#[command(version)]
#[command(about = "Discover a software vendor's customers", long_about = None)]
struct Cli {
    /// Vendor to research
    #[arg(value_name = "VENDOR")]
    vendor: String,

    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Maximum number of customers to return
    #[arg(short = 'n', long)]
    max_results: Option<usize>,

    /// Report format
    #[arg(short, long, value_enum, default_value_t = Format::Markdown)]
    format: Format,

    /// Write the report to a file instead of stdout
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Validate config and show which sources would run, without fetching
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Markdown,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = load(&cli)?;
    let max_results = cli.max_results.unwrap_or(config.jobs.default_max_results);

    if cli.dry_run {
        handle_dry_run(&config, &cli.vendor, max_results);
        return Ok(());
    }

    let report = handle_job(config, &cli.vendor, max_results).await?;
    emit_report(&cli, &report)?;

    if !report.status.is_success() {
        let reason = report
            .error_details
            .as_ref()
            .map(|e| format!("{}: {}", e.error_type, e.reasons.join("; ")))
            .unwrap_or_else(|| report.status.to_string());
        bail!("job {} failed ({})", report.job_id, reason);
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
            0 => EnvFilter::new("customer_scout=info,warn"),
            1 => EnvFilter::new("customer_scout=debug,info"),
            2 => EnvFilter::new("customer_scout=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Loads the config file, or validated defaults without one
fn load(cli: &Cli) -> anyhow::Result<Config> {
    match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            Ok(config)
        }
        None => {
            let config = Config::default();
            validate(&config).context("default configuration is invalid")?;
            Ok(config)
        }
    }
}

/// Handles the --dry-run mode: shows what a job would do
fn handle_dry_run(config: &Config, vendor: &str, max_results: usize) {
    println!("=== Customer Scout Dry Run ===\n");

    println!("Job:");
    println!("  Vendor: {}", vendor);
    println!("  Max results: {}", max_results);
    match config.jobs.job_timeout_secs {
        Some(secs) => println!("  Time limit: {}s", secs),
        None => println!("  Time limit: none"),
    }

    println!("\nCoordinator:");
    println!("  Workers per source: {}", config.coordinator.workers);
    println!(
        "  Batch size: {} ({}ms between batches)",
        config.coordinator.batch_size, config.coordinator.batch_delay_ms
    );
    println!("  Max retries: {}", config.coordinator.max_retries);

    println!("\nFetcher:");
    println!("  Request timeout: {}ms", config.fetcher.request_timeout_ms);
    println!("  Max connections: {}", config.fetcher.max_connections);
    println!("  Requests per second: {}", config.fetcher.requests_per_second);

    println!("\nValidation:");
    println!("  Minimum valid records: {}", config.validation.min_valid_records);
    println!("  DNS checks: {}", config.validation.check_dns);
    println!("  Name strictness: {:?}", config.validation.name_strictness);

    println!("\nSources ({}):", config.enabled_source_count());
    if config.vendor_site.enabled {
        println!("  - vendor site ({})", config.vendor_site.domain_template);
    }
    if config.featured_customers.enabled {
        println!("  - featured customers ({})", config.featured_customers.base_url);
    }
    if config.search_engine.enabled {
        println!(
            "  - search engine ({} queries)",
            config.search_engine.queries.len()
        );
    }
    if config.subdomain.enabled {
        println!("  - subdomain enumeration ({})", config.subdomain.page_pattern);
    }
    for site in &config.review_sites {
        println!("  - review site {} ({})", site.name, site.search_url);
    }
    for site in &config.tech_lookups {
        println!("  - technology lookup {} ({})", site.name, site.lookup_url);
    }

    println!("\n✓ Configuration is valid");
}

/// Runs one job to completion, logging progress as it moves
async fn handle_job(config: Config, vendor: &str, max_results: usize) -> anyhow::Result<JobReport> {
    let service = JobService::new(config).context("failed to start job service")?;
    let job_id = service.submit_job(vendor, max_results)?;

    poll_until_finished(&service, job_id).await
}

async fn poll_until_finished(service: &JobService, job_id: JobId) -> anyhow::Result<JobReport> {
    let mut last_step = None;
    let mut ticker = tokio::time::interval(POLL_INTERVAL);

    loop {
        ticker.tick().await;
        let Some(report) = service.get_job_status(&job_id) else {
            bail!("job {} disappeared", job_id);
        };

        if last_step != Some(report.progress.step) {
            tracing::info!("[{:>3}%] {}", report.progress.step, report.progress.message);
            last_step = Some(report.progress.step);
        }
        if report.status.is_terminal() {
            return Ok(report);
        }
    }
}

fn emit_report(cli: &Cli, report: &JobReport) -> anyhow::Result<()> {
    match (cli.format, &cli.output) {
        (Format::Json, Some(path)) => {
            std::fs::write(path, serde_json::to_string_pretty(report)?)
                .with_context(|| format!("failed to write {}", path.display()))?;
        }
        (Format::Json, None) => println!("{}", serde_json::to_string_pretty(report)?),
        (Format::Markdown, Some(path)) => {
            write_markdown_report(report, path)
                .with_context(|| format!("failed to write {}", path.display()))?;
        }
        (Format::Markdown, None) => {
            println!("{}", format_markdown_report(report));
        }
    }

    if let Some(path) = &cli.output {
        println!("✓ Report written to: {}", path.display());
    }
    if !cli.quiet && cli.format == Format::Markdown {
        print_statistics(report);
    }
    Ok(())
}
