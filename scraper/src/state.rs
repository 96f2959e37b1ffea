use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::calendar::DateUnit;
use crate::error::{CampaignError, FailureKind};
use crate::io::write_atomic;

/// Where a single day stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UnitStatus {
    Pending,
    /// Written before a unit runs. Never trusted after a restart.
    InProgress,
    Completed {
        artifacts: usize,
    },
    Failed {
        kind: FailureKind,
        reason: String,
    },
}

impl UnitStatus {
    pub fn failed(kind: FailureKind, reason: impl Into<String>) -> Self {
        UnitStatus::Failed {
            kind,
            reason: reason.into(),
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, UnitStatus::Completed { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, UnitStatus::Failed { .. })
    }
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitStatus::Pending => f.write_str("pending"),
            UnitStatus::InProgress => f.write_str("in progress"),
            UnitStatus::Completed { artifacts } => write!(f, "completed ({} pages)", artifacts),
            UnitStatus::Failed { kind, reason } => write!(f, "failed ({}: {})", kind, reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRecord {
    #[serde(flatten)]
    pub status: UnitStatus,
    pub updated_at: DateTime<Utc>,
}

/// Progress of every day a campaign has touched, keyed by ISO date.
///
/// Months share one flat map so several campaigns can live in the same file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScraperState {
    units: BTreeMap<DateUnit, UnitRecord>,
}

impl ScraperState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self, date: &DateUnit) -> Option<&UnitStatus> {
        self.units.get(date).map(|r| &r.status)
    }

    pub fn get(&self, date: &DateUnit) -> Option<&UnitRecord> {
        self.units.get(date)
    }

    /// Store `status` for `date`, replacing whatever was there.
    pub fn record(&mut self, date: DateUnit, status: UnitStatus) -> &UnitRecord {
        let record = UnitRecord {
            status,
            updated_at: Utc::now(),
        };
        self.units.insert(date, record);
        &self.units[&date]
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DateUnit, &UnitRecord)> {
        self.units.iter()
    }

    /// Turn records left `InProgress` by an aborted run into failures.
    ///
    /// Returns the affected dates.
    pub fn recover_interrupted(&mut self) -> Vec<DateUnit> {
        let interrupted: Vec<DateUnit> = self
            .units
            .iter()
            .filter(|(_, r)| r.status == UnitStatus::InProgress)
            .map(|(d, _)| *d)
            .collect();

        for date in &interrupted {
            self.record(
                *date,
                UnitStatus::failed(FailureKind::Unknown, "interrupted before completion"),
            );
        }
        interrupted
    }
}

/// Durable home of a [`ScraperState`].
pub trait StateStore {
    /// Read the persisted state. A store with nothing saved yet yields an empty state.
    fn load(&self) -> Result<ScraperState, CampaignError>;

    /// Write the whole state so a reader never observes a partial file.
    fn save(&self, state: &ScraperState) -> Result<(), CampaignError>;
}

/// State kept as a pretty-printed JSON object in a single file.
#[derive(Debug, Clone)]
pub struct JsonStateStore {
    path: PathBuf,
}

impl JsonStateStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for JsonStateStore {
    fn load(&self) -> Result<ScraperState, CampaignError> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No state at {}, starting fresh", self.path.display());
                return Ok(ScraperState::new());
            }
            Err(e) => return Err(CampaignError::persistence(&self.path, e)),
        };

        if json.trim().is_empty() {
            warn!("State file {} is empty, starting fresh", self.path.display());
            return Ok(ScraperState::new());
        }

        serde_json::from_str(&json).map_err(|e| CampaignError::persistence(&self.path, e))
    }

    fn save(&self, state: &ScraperState) -> Result<(), CampaignError> {
        let json = serde_json::to_string_pretty(state)
            .map_err(|e| CampaignError::persistence(&self.path, e))?;
        write_atomic(&self.path, json.as_bytes())
            .map_err(|e| CampaignError::persistence(&self.path, e))
    }
}
