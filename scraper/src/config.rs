use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

/// Dagens Nyheter, searched when no newspaper filter is given.
pub const DAGENS_NYHETER_ID: &str = "https://libris.kb.se/m5z2w4lz3m2zxpk#it";

/// Settings for the KB archive day scraper.
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub download_dir: PathBuf,
    pub search_url: String,
    pub api_base_url: String,
    pub default_paper_ids: Vec<String>,
    /// Attempts per page download.
    pub retry_count: u32,
    pub retry_backoff: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        ScraperConfig {
            download_dir: PathBuf::from("kb_newspapers"),
            search_url: "https://tidningar.kb.se/search".to_string(),
            api_base_url: "https://data.kb.se".to_string(),
            default_paper_ids: vec![DAGENS_NYHETER_ID.to_string()],
            retry_count: 3,
            retry_backoff: Duration::from_secs(2),
            request_timeout: Duration::from_secs(30),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36"
                .to_string(),
        }
    }
}

/// Settings for a month-long campaign.
#[derive(Debug, Clone)]
pub struct CampaignConfig {
    pub state_file: PathBuf,
    /// Pause between two units, to stay under the archive's rate limits.
    pub cooldown: Duration,
    /// Upper bound for scraping one day.
    pub unit_timeout: Duration,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        CampaignConfig {
            state_file: PathBuf::from("scraper_state.json"),
            cooldown: Duration::from_secs(30),
            unit_timeout: Duration::from_secs(30 * 60),
        }
    }
}

/// Verbosity of the binaries' log output. `RUST_LOG` still takes precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[clap(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

impl LogLevel {
    pub fn init_logger(self) {
        env_logger::Builder::new()
            .filter_level(self.into())
            .parse_default_env()
            .init();
    }
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
        }
    }
}
