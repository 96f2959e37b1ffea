use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use kb_newspaper_scraper::calendar::parse_iso;
use kb_newspaper_scraper::executor::deadline_after;
use kb_newspaper_scraper::{DayScraper, KbArchiveScraper, LogLevel, ScrapeRequest, ScraperConfig};

/// Download every newspaper page published in a date range
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Start date in YYYY-MM-DD format
    #[arg(long)]
    start_date: String,

    /// End date in YYYY-MM-DD format
    #[arg(long)]
    end_date: String,

    /// Optional paper id to filter by (defaults to Dagens Nyheter)
    #[arg(long)]
    paper_id: Option<String>,

    /// Directory to save downloads
    #[arg(long, default_value = "kb_newspapers")]
    download_dir: PathBuf,

    /// Give up after this many seconds
    #[arg(long, default_value_t = 1800)]
    timeout_secs: u64,

    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.log_level.init_logger();

    let start = parse_iso(&cli.start_date)?;
    let end = parse_iso(&cli.end_date)?;
    if end < start {
        anyhow::bail!("End date {} is before start date {}", end, start);
    }

    let config = ScraperConfig {
        download_dir: cli.download_dir,
        ..ScraperConfig::default()
    };
    let mut scraper = KbArchiveScraper::new(config).context("Failed to create HTTP session")?;

    let request = ScrapeRequest {
        start_date: start.iso(),
        end_date: end.iso(),
        newspaper_ids: cli.paper_id.into_iter().collect(),
        deadline: deadline_after(Instant::now(), Duration::from_secs(cli.timeout_secs)),
    };

    let output = scraper
        .scrape(&request)
        .with_context(|| format!("Failed to scrape {} to {}", start, end))?;

    println!(
        "Completed scraping. Downloaded {} issues ({} pages) successfully.",
        output.issues.len(),
        output.artifacts()
    );
    for (index, issue) in output.issues.iter().enumerate() {
        println!("{}. {} - {} ({} pages)", index + 1, issue.title, issue.date, issue.pages);
    }

    Ok(())
}
