use std::cell::Cell;
use std::collections::HashMap;
use tokio::runtime::Runtime;
use wiremock::{Mock, MockServer};

use crate::error::{CampaignError, ScrapeError};
use crate::executor::{DayScraper, IssueSummary, ScrapeOutput, ScrapeRequest};
use crate::state::{JsonStateStore, ScraperState, StateStore};

pub mod archive_tests;
pub mod fixtures;

/// What a [`ScriptedScraper`] does for a given start date.
#[derive(Debug, Clone)]
pub enum Scripted {
    Pages(usize),
    Network(&'static str),
    Parse(&'static str),
    Timeout(&'static str),
    Panic,
}

/// Day scraper that follows a script keyed by start date and records every call.
#[derive(Debug, Default)]
pub struct ScriptedScraper {
    script: HashMap<String, Scripted>,
    default_pages: usize,
    pub calls: Vec<ScrapeRequest>,
}

impl ScriptedScraper {
    pub fn new(default_pages: usize) -> Self {
        Self {
            default_pages,
            ..Self::default()
        }
    }

    pub fn on(mut self, date: &str, scripted: Scripted) -> Self {
        self.script.insert(date.to_string(), scripted);
        self
    }

    /// Start dates of every call, in order.
    pub fn called_dates(&self) -> Vec<String> {
        self.calls.iter().map(|r| r.start_date.clone()).collect()
    }
}

impl DayScraper for ScriptedScraper {
    fn scrape(&mut self, request: &ScrapeRequest) -> Result<ScrapeOutput, ScrapeError> {
        self.calls.push(request.clone());
        let scripted = self
            .script
            .get(&request.start_date)
            .cloned()
            .unwrap_or(Scripted::Pages(self.default_pages));

        match scripted {
            Scripted::Pages(pages) => Ok(ScrapeOutput {
                issues: vec![IssueSummary {
                    title: "DAGENS NYHETER".to_string(),
                    date: request.start_date.clone(),
                    pages,
                }],
            }),
            Scripted::Network(msg) => Err(ScrapeError::Network(msg.to_string())),
            Scripted::Parse(msg) => Err(ScrapeError::Parse(msg.to_string())),
            Scripted::Timeout(msg) => Err(ScrapeError::Timeout(msg.to_string())),
            Scripted::Panic => panic!("scraper killed while scraping {}", request.start_date),
        }
    }
}

/// JSON store whose first `failures` saves fail.
pub struct FlakyStore {
    inner: JsonStateStore,
    failures: Cell<usize>,
    pub attempts: Cell<usize>,
}

impl FlakyStore {
    pub fn new(inner: JsonStateStore, failures: usize) -> Self {
        Self {
            inner,
            failures: Cell::new(failures),
            attempts: Cell::new(0),
        }
    }
}

impl StateStore for FlakyStore {
    fn load(&self) -> Result<ScraperState, CampaignError> {
        self.inner.load()
    }

    fn save(&self, state: &ScraperState) -> Result<(), CampaignError> {
        self.attempts.set(self.attempts.get() + 1);
        if self.failures.get() > 0 {
            self.failures.set(self.failures.get() - 1);
            return Err(CampaignError::persistence(self.inner.path(), "disk full"));
        }
        self.inner.save(state)
    }
}

/// Local HTTP server playing the archive, driven from synchronous tests.
pub struct MockArchive {
    // Declared first so the server goes away before its runtime
    server: MockServer,
    runtime: Runtime,
}

impl MockArchive {
    pub fn start() -> Self {
        let runtime = Runtime::new().unwrap();
        let server = runtime.block_on(MockServer::start());
        Self { server, runtime }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub fn mount(&self, mock: Mock) {
        self.runtime.block_on(mock.mount(&self.server));
    }

    /// Number of requests received for `path`.
    pub fn requests_to(&self, path: &str) -> usize {
        self.runtime
            .block_on(self.server.received_requests())
            .unwrap_or_default()
            .iter()
            .filter(|request| request.url.path() == path)
            .count()
    }
}
