use log::{info, warn};
use std::time::{Duration, Instant};

use crate::error::{FailureKind, ScrapeError};
use crate::operation::WorkItem;
use crate::state::UnitStatus;

/// Parameters for one scrape call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeRequest {
    /// `YYYY-MM-DD`, inclusive.
    pub start_date: String,
    /// `YYYY-MM-DD`, the day after the last day wanted.
    pub end_date: String,
    /// Empty means the scraper's defaults.
    pub newspaper_ids: Vec<String>,
    /// Scrapers should give up with [`ScrapeError::Timeout`] once this passes.
    pub deadline: Instant,
}

/// `start + timeout`, saturating to roughly a century out when the sum overflows.
pub fn deadline_after(start: Instant, timeout: Duration) -> Instant {
    const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);
    start
        .checked_add(timeout)
        .or_else(|| start.checked_add(FAR_FUTURE))
        .unwrap_or(start)
}

/// One newspaper issue saved to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueSummary {
    pub title: String,
    pub date: String,
    pub pages: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapeOutput {
    pub issues: Vec<IssueSummary>,
}

impl ScrapeOutput {
    /// Number of page images on disk for the scraped range.
    pub fn artifacts(&self) -> usize {
        self.issues.iter().map(|i| i.pages).sum()
    }
}

/// Something that can fetch every page image for a date range.
///
/// Implementations hold their session (HTTP client, cookies) across calls so a
/// campaign reuses one session for all its days.
pub trait DayScraper {
    fn scrape(&mut self, request: &ScrapeRequest) -> Result<ScrapeOutput, ScrapeError>;
}

/// Result of running one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOutcome {
    Completed { artifacts: usize },
    Failed { kind: FailureKind, reason: String },
}

impl UnitOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, UnitOutcome::Completed { .. })
    }

    pub fn into_status(self) -> UnitStatus {
        match self {
            UnitOutcome::Completed { artifacts } => UnitStatus::Completed { artifacts },
            UnitOutcome::Failed { kind, reason } => UnitStatus::Failed { kind, reason },
        }
    }
}

/// Runs a single day through a [`DayScraper`] and classifies what happened.
///
/// There is no retrying here: a failed day is reported as failed and left for
/// `retry-failed`.
pub struct UnitExecutor<D> {
    scraper: D,
    timeout: Duration,
}

impl<D: DayScraper> UnitExecutor<D> {
    pub fn new(scraper: D, timeout: Duration) -> Self {
        Self { scraper, timeout }
    }

    pub fn scraper(&self) -> &D {
        &self.scraper
    }

    pub fn into_scraper(self) -> D {
        self.scraper
    }

    pub fn execute(&mut self, item: &WorkItem) -> UnitOutcome {
        let started = Instant::now();
        let request = ScrapeRequest {
            start_date: item.start.iso(),
            end_date: item.end.iso(),
            newspaper_ids: item.newspaper_ids.clone(),
            deadline: deadline_after(started, self.timeout),
        };

        let result = self.scraper.scrape(&request);
        let elapsed = started.elapsed();

        let outcome = match result {
            Ok(_) if elapsed > self.timeout => UnitOutcome::Failed {
                kind: FailureKind::Timeout,
                reason: format!(
                    "finished after {}ms, limit is {}ms",
                    elapsed.as_millis(),
                    self.timeout.as_millis()
                ),
            },
            Ok(output) => UnitOutcome::Completed {
                artifacts: output.artifacts(),
            },
            Err(e) => UnitOutcome::Failed {
                kind: e.kind(),
                reason: e.message().to_string(),
            },
        };

        match &outcome {
            UnitOutcome::Completed { artifacts } => {
                info!("{}: completed with {} pages in {:.1}s", item.date, artifacts, elapsed.as_secs_f64())
            }
            UnitOutcome::Failed { kind, reason } => {
                warn!("{}: failed ({}): {}", item.date, kind, reason)
            }
        }
        outcome
    }
}
