pub mod archive;
pub mod calendar;
pub mod config;
pub mod error;
pub mod executor;
pub mod io;
pub mod operation;
pub mod orchestrator;
pub mod state;

#[cfg(test)]
pub mod tests;

// Re-export key types and functions for easier access
pub use crate::archive::{parse_manifest, parse_search_results, KbArchiveScraper, NewspaperIssue};
pub use crate::calendar::{days_in_month, month_days, DateUnit};
pub use crate::config::{CampaignConfig, LogLevel, ScraperConfig};
pub use crate::error::{CampaignError, FailureKind, ScrapeError};
pub use crate::executor::{DayScraper, ScrapeOutput, ScrapeRequest, UnitExecutor, UnitOutcome};
pub use crate::operation::{
    select, OperationKind, OperationRequest, Selection, StartPolicy, VerifyReport, WorkItem,
};
pub use crate::orchestrator::{CampaignPhase, CampaignSummary, Orchestrator};
pub use crate::state::{JsonStateStore, ScraperState, StateStore, UnitRecord, UnitStatus};
