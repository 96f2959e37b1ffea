use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::orchestrator::CampaignSummary;

/// Errors that stop a campaign before or while it runs.
#[derive(Debug, Error)]
pub enum CampaignError {
    /// Bad operation name, year or month. No work is attempted.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The state file could not be read or written.
    #[error("Persistence error for {}: {message}", .path.display())]
    Persistence { path: PathBuf, message: String },

    /// The run finished but its last outcomes never reached the state file.
    #[error("Campaign finished but its state was not saved: {source}")]
    Unsaved {
        summary: Box<CampaignSummary>,
        source: Box<CampaignError>,
    },
}

impl CampaignError {
    pub fn persistence(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        CampaignError::Persistence {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

/// Coarse classification of why a day failed, stored alongside the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    Network,
    Parse,
    Timeout,
    Unknown,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::Network => "network",
            FailureKind::Parse => "parse",
            FailureKind::Timeout => "timeout",
            FailureKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Failure reported by a day scraper.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("{0}")]
    Other(String),
}

impl ScrapeError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ScrapeError::Network(_) => FailureKind::Network,
            ScrapeError::Parse(_) => FailureKind::Parse,
            ScrapeError::Timeout(_) => FailureKind::Timeout,
            ScrapeError::Io(_) | ScrapeError::Other(_) => FailureKind::Unknown,
        }
    }

    /// Same classification, different message.
    pub fn with_message(self, message: String) -> Self {
        match self {
            ScrapeError::Network(_) => ScrapeError::Network(message),
            ScrapeError::Parse(_) => ScrapeError::Parse(message),
            ScrapeError::Timeout(_) => ScrapeError::Timeout(message),
            ScrapeError::Io(_) => ScrapeError::Io(message),
            ScrapeError::Other(_) => ScrapeError::Other(message),
        }
    }

    /// The message without the classification prefix.
    pub fn message(&self) -> &str {
        match self {
            ScrapeError::Network(m)
            | ScrapeError::Parse(m)
            | ScrapeError::Timeout(m)
            | ScrapeError::Io(m)
            | ScrapeError::Other(m) => m,
        }
    }
}

impl From<reqwest::Error> for ScrapeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ScrapeError::Timeout(err.to_string())
        } else if err.is_decode() {
            ScrapeError::Parse(err.to_string())
        } else {
            ScrapeError::Network(err.to_string())
        }
    }
}

impl From<std::io::Error> for ScrapeError {
    fn from(err: std::io::Error) -> Self {
        ScrapeError::Io(err.to_string())
    }
}
