use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ImportError;
use crate::errors::Error;
use crate::portfolio::anomalies::Anomaly;
use crate::transactions::NewTransaction;

/// A statement row that could not be turned into a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MalformedRow {
    /// 1-based line in the decoded file.
    pub line: usize,
    pub reason: String,
}

/// Normalized output of a statement parser.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedStatement {
    pub events: Vec<NewTransaction>,
    pub malformed: Vec<MalformedRow>,
    /// Well-formed rows deliberately left out (dividends, outside the window).
    pub ignored: usize,
}

/// Counts reported back for one import.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub parsed: usize,
    pub malformed: usize,
    pub ignored: usize,
    pub inserted: usize,
    pub skipped_duplicates: usize,
    pub malformed_rows: Vec<MalformedRow>,
    pub anomalies: Vec<Anomaly>,
}

/// Supported broker statement layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatementFormat {
    TwBroker,
    UsBroker,
}

impl StatementFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatementFormat::TwBroker => "TW_BROKER",
            StatementFormat::UsBroker => "US_BROKER",
        }
    }
}

impl fmt::Display for StatementFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatementFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "TW" | "TW_BROKER" => Ok(StatementFormat::TwBroker),
            "US" | "US_BROKER" => Ok(StatementFormat::UsBroker),
            other => Err(ImportError::UnknownFormat(other.to_string()).into()),
        }
    }
}

/// Inclusive trade-date filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateWindow {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }
}
