use chrono::{Datelike, Utc};
use std::fmt;
use std::str::FromStr;

use crate::calendar::{month_days, DateUnit, FIRST_ARCHIVE_YEAR};
use crate::error::CampaignError;
use crate::state::{ScraperState, UnitStatus};

/// The four things a campaign can be asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    StartMonth,
    ContinueScraping,
    RetryFailed,
    VerifyMonth,
}

impl OperationKind {
    pub const ALL: [OperationKind; 4] = [
        OperationKind::StartMonth,
        OperationKind::ContinueScraping,
        OperationKind::RetryFailed,
        OperationKind::VerifyMonth,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            OperationKind::StartMonth => "start-month",
            OperationKind::ContinueScraping => "continue-scraping",
            OperationKind::RetryFailed => "retry-failed",
            OperationKind::VerifyMonth => "verify-month",
        }
    }

    /// Whether the operation only reports and never scrapes.
    pub fn is_read_only(&self) -> bool {
        matches!(self, OperationKind::VerifyMonth)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OperationKind {
    type Err = CampaignError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        OperationKind::ALL
            .into_iter()
            .find(|k| k.name() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = OperationKind::ALL.iter().map(|k| k.name()).collect();
                CampaignError::InvalidRequest(format!(
                    "Unknown operation '{}', expected one of: {}",
                    s,
                    known.join(", ")
                ))
            })
    }
}

/// How `start-month` treats days that are already completed.
///
/// `ReprocessAll` scrapes every day of the month again; it is meant for a
/// first run. `SkipCompleted` leaves completed days alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartPolicy {
    #[default]
    ReprocessAll,
    SkipCompleted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRequest {
    pub kind: OperationKind,
    pub year: i32,
    pub month: u32,
    /// Empty means the scraper's default newspapers.
    pub newspaper_ids: Vec<String>,
    pub start_policy: StartPolicy,
}

impl OperationRequest {
    /// Build a request from raw driver input and validate it.
    pub fn parse(
        operation: &str,
        year: i32,
        month: u32,
        newspaper_ids: Option<&str>,
    ) -> Result<Self, CampaignError> {
        let request = OperationRequest {
            kind: operation.parse()?,
            year,
            month,
            newspaper_ids: newspaper_ids.map(split_ids).unwrap_or_default(),
            start_policy: StartPolicy::default(),
        };
        request.validate()?;
        Ok(request)
    }

    pub fn with_start_policy(mut self, policy: StartPolicy) -> Self {
        self.start_policy = policy;
        self
    }

    pub fn validate(&self) -> Result<(), CampaignError> {
        let current_year = Utc::now().year();
        if self.year < FIRST_ARCHIVE_YEAR || self.year > current_year {
            return Err(CampaignError::InvalidRequest(format!(
                "Year {} is outside the archive's range {}-{}",
                self.year, FIRST_ARCHIVE_YEAR, current_year
            )));
        }
        if !(1..=12).contains(&self.month) {
            return Err(CampaignError::InvalidRequest(format!(
                "Month must be between 1 and 12, got {}",
                self.month
            )));
        }
        Ok(())
    }

    /// `YYYY-MM` label for logs and reports.
    pub fn month_label(&self) -> String {
        format!("{}-{:02}", self.year, self.month)
    }
}

/// Split a comma separated id list, dropping blanks.
pub fn split_ids(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// One day ready to hand to a day scraper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub date: DateUnit,
    pub start: DateUnit,
    /// Exclusive upper bound of the search, the day after `start`.
    pub end: DateUnit,
    pub newspaper_ids: Vec<String>,
}

impl WorkItem {
    pub fn new(date: DateUnit, newspaper_ids: &[String]) -> Self {
        WorkItem {
            date,
            start: date,
            end: date.next(),
            newspaper_ids: newspaper_ids.to_vec(),
        }
    }
}

/// Per-bucket breakdown of a month, produced by `verify-month`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    pub month: String,
    pub completed: Vec<DateUnit>,
    pub failed: Vec<(DateUnit, String)>,
    /// Recorded as pending (or still marked in progress).
    pub pending: Vec<DateUnit>,
    /// No record at all.
    pub missing: Vec<DateUnit>,
    pub artifacts: usize,
}

impl VerifyReport {
    pub fn total_days(&self) -> usize {
        self.completed.len() + self.failed.len() + self.pending.len() + self.missing.len()
    }

    /// Days still to do, whether recorded as pending or never attempted.
    pub fn pending_total(&self) -> usize {
        self.pending.len() + self.missing.len()
    }

    pub fn failed_dates(&self) -> Vec<DateUnit> {
        self.failed.iter().map(|(d, _)| *d).collect()
    }

    pub fn is_complete(&self) -> bool {
        self.completed.len() == self.total_days()
    }
}

/// What an operation resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Work(Vec<WorkItem>),
    Report(VerifyReport),
}

/// Resolve a validated request against the current state.
///
/// Work items come back in chronological order.
pub fn select(request: &OperationRequest, state: &ScraperState) -> Result<Selection, CampaignError> {
    request.validate()?;
    let days = month_days(request.year, request.month)?;

    if request.kind == OperationKind::VerifyMonth {
        return Ok(Selection::Report(verify(request, &days, state)));
    }

    let items = days
        .into_iter()
        .filter(|d| needs_run(request, state.status(d)))
        .map(|d| WorkItem::new(d, &request.newspaper_ids))
        .collect();
    Ok(Selection::Work(items))
}

fn needs_run(request: &OperationRequest, status: Option<&UnitStatus>) -> bool {
    let completed = status.map_or(false, UnitStatus::is_completed);
    match request.kind {
        OperationKind::StartMonth => match request.start_policy {
            StartPolicy::ReprocessAll => true,
            StartPolicy::SkipCompleted => !completed,
        },
        OperationKind::ContinueScraping => !completed,
        OperationKind::RetryFailed => status.map_or(false, UnitStatus::is_failed),
        OperationKind::VerifyMonth => false,
    }
}

fn verify(request: &OperationRequest, days: &[DateUnit], state: &ScraperState) -> VerifyReport {
    let mut report = VerifyReport {
        month: request.month_label(),
        ..VerifyReport::default()
    };

    for day in days {
        match state.status(day) {
            None => report.missing.push(*day),
            Some(UnitStatus::Pending) | Some(UnitStatus::InProgress) => report.pending.push(*day),
            Some(UnitStatus::Completed { artifacts }) => {
                report.completed.push(*day);
                report.artifacts += artifacts;
            }
            Some(UnitStatus::Failed { kind, reason }) => {
                report.failed.push((*day, format!("{}: {}", kind, reason)));
            }
        }
    }
    report
}

impl fmt::Display for VerifyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Days in month: {}", self.total_days())?;
        writeln!(f, "Completed:     {} ({} pages)", self.completed.len(), self.artifacts)?;
        writeln!(f, "Failed:        {}", self.failed.len())?;
        writeln!(
            f,
            "Pending:       {} ({} never attempted)",
            self.pending_total(),
            self.missing.len()
        )?;

        if !self.failed.is_empty() {
            writeln!(f, "\nFailed days:")?;
            for (index, (date, reason)) in self.failed.iter().enumerate() {
                writeln!(f, "{}. {} - {}", index + 1, date, reason)?;
            }
        }

        let mut pending: Vec<String> = self
            .pending
            .iter()
            .chain(self.missing.iter())
            .map(|d| d.to_string())
            .collect();
        pending.sort();
        if !pending.is_empty() {
            writeln!(f, "\nPending days:")?;
            for date in pending {
                writeln!(f, "   {}", date)?;
            }
        }
        Ok(())
    }
}
