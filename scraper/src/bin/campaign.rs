use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use kb_newspaper_scraper::{
    CampaignConfig, CampaignError, JsonStateStore, KbArchiveScraper, LogLevel, OperationRequest, Orchestrator,
    ScraperConfig, StartPolicy, UnitExecutor,
};

/// Scrape a whole month of KB newspapers, one day at a time, resuming where the last run stopped
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// start-month, continue-scraping, retry-failed or verify-month
    operation: String,

    /// Year to scrape (e.g. 1865)
    year: i32,

    /// Month to scrape, 1-12
    month: u32,

    /// Comma separated newspaper ids (defaults to Dagens Nyheter)
    #[arg(long)]
    newspaper_ids: Option<String>,

    /// Progress file shared by every run of the campaign
    #[arg(long, default_value = "scraper_state.json")]
    state_file: PathBuf,

    /// Where page images are written
    #[arg(long, default_value = "kb_newspapers")]
    download_dir: PathBuf,

    /// Seconds to wait between two days
    #[arg(long, default_value_t = 30)]
    delay_secs: u64,

    /// Give up on a day after this many seconds
    #[arg(long, default_value_t = 1800)]
    timeout_secs: u64,

    /// With start-month, leave days that are already completed alone
    #[arg(long)]
    skip_completed: bool,

    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    cli.log_level.init_logger();

    let policy = if cli.skip_completed {
        StartPolicy::SkipCompleted
    } else {
        StartPolicy::ReprocessAll
    };
    let request = OperationRequest::parse(
        &cli.operation,
        cli.year,
        cli.month,
        cli.newspaper_ids.as_deref(),
    )?
    .with_start_policy(policy);

    let campaign = CampaignConfig {
        state_file: cli.state_file,
        cooldown: Duration::from_secs(cli.delay_secs),
        unit_timeout: Duration::from_secs(cli.timeout_secs),
    };
    let scraper_config = ScraperConfig {
        download_dir: cli.download_dir,
        ..ScraperConfig::default()
    };

    let store = JsonStateStore::new(&campaign.state_file);
    let scraper = KbArchiveScraper::new(scraper_config).context("Failed to create HTTP session")?;
    let executor = UnitExecutor::new(scraper, campaign.unit_timeout);
    let mut orchestrator = Orchestrator::new(store, executor, campaign.cooldown);

    let summary = match orchestrator.run(&request) {
        Ok(summary) => summary,
        Err(CampaignError::Unsaved { summary, source }) => {
            // Report every day's result even though the state file is stale
            println!("\n{}", summary);
            anyhow::bail!(
                "Campaign {} {} finished but {} could not be updated: {}",
                request.kind,
                request.month_label(),
                campaign.state_file.display(),
                source
            );
        }
        Err(e) => {
            return Err(e).with_context(|| {
                format!("Campaign {} {} failed", request.kind, request.month_label())
            })
        }
    };

    println!("\n{}", summary);
    println!("State saved to {}", campaign.state_file.display());

    Ok(())
}
