use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::Path;

use kb_newspaper_scraper::calendar::parse_iso;
use kb_newspaper_scraper::{parse_search_results, KbArchiveScraper, LogLevel, ScraperConfig};

/// Save one day's search results page as a regression fixture
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Day to fetch, YYYY-MM-DD
    date: String,

    /// Fixture name, saved as src/tests/fixtures/failures/<name>.html
    test_name: String,

    /// Paper id to search (defaults to Dagens Nyheter)
    #[arg(long)]
    paper_id: Option<String>,

    #[arg(long, value_enum, default_value_t = LogLevel::Warn)]
    log_level: LogLevel,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.log_level.init_logger();

    let day = parse_iso(&cli.date)?;
    let config = ScraperConfig::default();
    let paper_id = cli
        .paper_id
        .clone()
        .or_else(|| config.default_paper_ids.first().cloned())
        .context("No paper id given and no default configured")?;

    println!("Fetching search results for {} ({})...", day, paper_id);

    let scraper = KbArchiveScraper::new(config).context("Failed to create HTTP session")?;
    let html = scraper
        .fetch_search_page(&day.iso(), &day.next().iso(), &paper_id)
        .context("Failed to fetch search page")?;

    // Create failures directory if it doesn't exist
    let failures_dir = Path::new("src/tests/fixtures/failures");
    fs::create_dir_all(failures_dir).context("Failed to create failures directory")?;

    // Save the HTML for testing
    let file_path = failures_dir.join(format!("{}.html", cli.test_name));
    fs::write(&file_path, &html).context("Failed to write HTML file")?;

    println!(
        "Saved HTML to {} for regression testing",
        file_path.display()
    );

    // Now try to parse it with the actual parser
    let issues = parse_search_results(&html);
    if issues.is_empty() {
        println!("No issues parsed from the page.");
        if html.contains("search-result-item") {
            println!("   Result markup is present - likely a manifest link parsing issue");
        } else {
            println!("   No result markup found - the page may be rendered client side or empty");
        }
    } else {
        println!("Parsed {} issues:", issues.len());
        for (index, issue) in issues.iter().enumerate() {
            println!("{}. {} - {} ({})", index + 1, issue.title, issue.date, issue.manifest_id);
        }
    }

    Ok(())
}
