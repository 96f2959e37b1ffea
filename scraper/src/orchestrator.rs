use log::{error, info, warn};
use std::fmt;
use std::thread;
use std::time::Duration;

use crate::calendar::DateUnit;
use crate::error::CampaignError;
use crate::executor::{DayScraper, UnitExecutor, UnitOutcome};
use crate::operation::{select, OperationKind, OperationRequest, Selection, VerifyReport};
use crate::state::{ScraperState, StateStore, UnitStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CampaignPhase {
    NotStarted,
    Running,
    Finished,
}

/// What one campaign run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignSummary {
    pub operation: OperationKind,
    pub month: String,
    /// Every date handed to the executor, in order.
    pub executed: Vec<DateUnit>,
    pub completed: Vec<DateUnit>,
    pub failed: Vec<(DateUnit, String)>,
    pub artifacts: usize,
    /// Only set for `verify-month`.
    pub report: Option<VerifyReport>,
    /// Dates whose outcome could not be saved right away, even after a retry.
    pub unsaved: Vec<DateUnit>,
}

impl CampaignSummary {
    fn new(request: &OperationRequest) -> Self {
        CampaignSummary {
            operation: request.kind,
            month: request.month_label(),
            executed: Vec::new(),
            completed: Vec::new(),
            failed: Vec::new(),
            artifacts: 0,
            report: None,
            unsaved: Vec::new(),
        }
    }

    fn add(&mut self, date: DateUnit, outcome: &UnitOutcome) {
        self.executed.push(date);
        match outcome {
            UnitOutcome::Completed { artifacts } => {
                self.completed.push(date);
                self.artifacts += artifacts;
            }
            UnitOutcome::Failed { kind, reason } => {
                self.failed.push((date, format!("{}: {}", kind, reason)));
            }
        }
    }
}

/// Drives the days of one month through a [`UnitExecutor`], one at a time,
/// saving the state after every day.
///
/// Only one orchestrator may run against a given state file at a time.
pub struct Orchestrator<S, D> {
    store: S,
    executor: UnitExecutor<D>,
    cooldown: Duration,
    phase: CampaignPhase,
}

impl<S: StateStore, D: DayScraper> Orchestrator<S, D> {
    pub fn new(store: S, executor: UnitExecutor<D>, cooldown: Duration) -> Self {
        Self {
            store,
            executor,
            cooldown,
            phase: CampaignPhase::NotStarted,
        }
    }

    pub fn phase(&self) -> CampaignPhase {
        self.phase
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn executor(&self) -> &UnitExecutor<D> {
        &self.executor
    }

    pub fn run(&mut self, request: &OperationRequest) -> Result<CampaignSummary, CampaignError> {
        request.validate()?;

        let mut state = self.store.load()?;
        for date in state.recover_interrupted() {
            warn!("{}: left in progress by an earlier run, treating as failed", date);
        }

        let mut summary = CampaignSummary::new(request);
        let items = match select(request, &state)? {
            Selection::Report(report) => {
                info!(
                    "Verified {}: {} completed, {} failed, {} pending",
                    report.month,
                    report.completed.len(),
                    report.failed.len(),
                    report.pending_total()
                );
                summary.report = Some(report);
                self.phase = CampaignPhase::Finished;
                return Ok(summary);
            }
            Selection::Work(items) => items,
        };

        info!(
            "{} {}: {} days to scrape",
            request.kind,
            summary.month,
            items.len()
        );
        self.phase = CampaignPhase::Running;

        let mut last_save = Ok(());
        for (index, item) in items.iter().enumerate() {
            info!("Processing day {}/{}: {}", index + 1, items.len(), item.date);

            state.record(item.date, UnitStatus::InProgress);
            if let Err(e) = self.persist(&state) {
                warn!("{}: could not mark as in progress: {}", item.date, e);
            }

            let outcome = self.executor.execute(item);
            summary.add(item.date, &outcome);

            state.record(item.date, outcome.into_status());
            last_save = self.persist(&state);
            if let Err(e) = &last_save {
                error!("{}: outcome kept in memory only: {}", item.date, e);
                summary.unsaved.push(item.date);
            }

            if index + 1 < items.len() && !self.cooldown.is_zero() {
                info!("Cooling down for {}s", self.cooldown.as_secs());
                thread::sleep(self.cooldown);
            }
        }

        self.phase = CampaignPhase::Finished;
        info!(
            "{} {} finished: {} completed, {} failed",
            request.kind,
            summary.month,
            summary.completed.len(),
            summary.failed.len()
        );

        // Each save writes the whole state, so a later success covers earlier failures.
        match last_save {
            Ok(()) => Ok(summary),
            Err(e) => Err(CampaignError::Unsaved {
                summary: Box::new(summary),
                source: Box::new(e),
            }),
        }
    }

    /// Save, retrying once before giving up.
    fn persist(&self, state: &ScraperState) -> Result<(), CampaignError> {
        match self.store.save(state) {
            Ok(()) => Ok(()),
            Err(first) => {
                warn!("Saving state failed ({}), retrying once", first);
                self.store.save(state)
            }
        }
    }
}

impl fmt::Display for CampaignSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Campaign {} for {}", self.operation, self.month)?;
        writeln!(f, "{}", "-".repeat(50))?;

        if let Some(report) = &self.report {
            return write!(f, "{}", report);
        }

        writeln!(f, "Days run:   {}", self.executed.len())?;
        writeln!(f, "Completed:  {}", self.completed.len())?;
        writeln!(f, "Failed:     {}", self.failed.len())?;
        writeln!(f, "Pages:      {}", self.artifacts)?;

        if !self.failed.is_empty() {
            writeln!(f, "\nFailed days:")?;
            for (index, (date, reason)) in self.failed.iter().enumerate() {
                writeln!(f, "{}. {} - {}", index + 1, date, reason)?;
            }
        }

        if !self.unsaved.is_empty() {
            writeln!(f, "\nOutcomes that were not saved immediately:")?;
            for date in &self.unsaved {
                writeln!(f, "   {}", date)?;
            }
        }
        Ok(())
    }
}
