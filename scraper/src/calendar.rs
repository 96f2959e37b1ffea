use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CampaignError;

/// Earliest year the newspaper archive holds issues for.
pub const FIRST_ARCHIVE_YEAR: i32 = 1645;

/// One calendar day, the unit of scraping work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DateUnit(NaiveDate);

impl DateUnit {
    pub fn new(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(DateUnit)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// The following day, used as the exclusive end of a one-day search.
    pub fn next(&self) -> DateUnit {
        DateUnit(self.0 + Duration::days(1))
    }

    /// ISO `YYYY-MM-DD` form, the key used in the state file.
    pub fn iso(&self) -> String {
        self.0.format("%Y-%m-%d").to_string()
    }
}

impl From<NaiveDate> for DateUnit {
    fn from(date: NaiveDate) -> Self {
        DateUnit(date)
    }
}

impl fmt::Display for DateUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// Get the last day of a month
pub fn days_in_month(year: i32, month: u32) -> Result<u32, CampaignError> {
    let first_day = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| CampaignError::InvalidRequest(format!("{}-{:02} is not a month", year, month)))?;

    // The last day of the month is the day before the first day of the next month
    let first_day_of_next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        first_day.with_month(month + 1)
    };

    first_day_of_next_month
        .and_then(|d| d.pred_opt())
        .map(|last| last.day())
        .ok_or_else(|| CampaignError::InvalidRequest(format!("{}-{:02} is out of range", year, month)))
}

/// Every day of the month in chronological order.
pub fn month_days(year: i32, month: u32) -> Result<Vec<DateUnit>, CampaignError> {
    let last = days_in_month(year, month)?;
    Ok((1..=last)
        .filter_map(|day| DateUnit::new(year, month, day))
        .collect())
}

/// Parse a `YYYY-MM-DD` string.
pub fn parse_iso(value: &str) -> Result<DateUnit, CampaignError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map(DateUnit)
        .map_err(|e| CampaignError::InvalidRequest(format!("Invalid date '{}': {}", value, e)))
}
