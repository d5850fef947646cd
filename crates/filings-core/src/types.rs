//! Core data types for the filings pipeline.
//!
//! This module defines the fundamental data structures:
//!
//! - [`Cik`] - Zero-padded SEC Central Index Key
//! - [`Ticker`] - Uppercase trading symbol
//! - [`FactRow`] - One flattened XBRL fact observation
//! - [`SubmissionRow`] - One filing event from a company's recent history
//! - [`BatchPurpose`] - Which half of a staged batch a file holds

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Number;
use std::fmt;
use std::str::FromStr;

/// Width of a zero-padded CIK.
pub const CIK_WIDTH: usize = 10;

/// SEC Central Index Key, always zero-padded to [`CIK_WIDTH`] digits.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cik(String);

impl Cik {
    /// Creates a CIK from any string form, left-padding with `0` to width 10.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        let s = s.into();
        Self(format!("{:0>width$}", s.trim(), width = CIK_WIDTH))
    }

    /// Creates a CIK from the raw numeric id the SEC publishes.
    #[must_use]
    pub fn from_raw(raw: u64) -> Self {
        Self(format!("{:0>width$}", raw, width = CIK_WIDTH))
    }

    /// Returns the padded CIK as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cik {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Cik {
    fn from(raw: u64) -> Self {
        Self::from_raw(raw)
    }
}

/// A trading symbol/ticker.
///
/// Tickers are automatically uppercased on creation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Ticker(String);

impl Ticker {
    /// Creates a new ticker from a string, trimming and converting to uppercase.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().trim().to_uppercase())
    }

    /// Returns the ticker as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the ticker is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Ticker {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for Ticker {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Ticker {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// One reported value of a concept/unit pair, flattened for columnar storage.
///
/// Field names are the column names of the raw facts table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FactRow {
    /// Company CIK.
    pub cik: Cik,
    /// Company ticker.
    pub ticker: Ticker,
    /// `namespace:concept` composite, e.g. `us-gaap:Revenues`.
    pub concept: String,
    /// Unit of measure, e.g. `USD` or `USD/shares`.
    pub unit: String,
    /// Period end date, or the fiscal year when no end date was reported.
    pub period_end_date: String,
    /// Reported value, kept exactly as the API encoded it.
    pub val: Option<Number>,
    /// Accession number of the filing that reported the value.
    pub accn: Option<String>,
    /// Fiscal year.
    pub fy: Option<i64>,
    /// Fiscal period (`FY`, `Q1`..`Q4`).
    pub fp: Option<String>,
    /// Form type (`10-K`, `10-Q`, ...).
    pub form: Option<String>,
    /// Filing date.
    pub filed: Option<String>,
}

/// One filing event from a company's recent submission history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRow {
    /// Company CIK.
    pub cik: Cik,
    /// Company ticker.
    pub ticker: Ticker,
    /// Registrant name.
    pub company_name: String,
    /// Accession number.
    pub accession_no: String,
    /// Form type.
    pub form: String,
    /// Filing date.
    pub filed: String,
    /// Report period date (may be empty for forms without a period).
    pub report_period: String,
}

/// The two halves of a staged batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BatchPurpose {
    /// Flattened XBRL fact observations.
    CompanyFacts,
    /// Flattened filing submissions.
    Submissions,
}

impl BatchPurpose {
    /// Both purposes, in staging order.
    pub const ALL: [Self; 2] = [Self::CompanyFacts, Self::Submissions];

    /// File stem used in object keys.
    #[must_use]
    pub const fn file_stem(&self) -> &'static str {
        match self {
            Self::CompanyFacts => "companyfacts",
            Self::Submissions => "submissions",
        }
    }

    /// Raw warehouse table this file is appended to.
    #[must_use]
    pub const fn raw_table(&self) -> &'static str {
        match self {
            Self::CompanyFacts => "raw_companyfacts",
            Self::Submissions => "raw_submissions",
        }
    }

    /// Object key for this purpose in the batch of `run_date`.
    ///
    /// Format: `raw/<YYYYMMDD>/<stem>.ndjson`.
    #[must_use]
    pub fn object_key(&self, run_date: NaiveDate) -> String {
        format!(
            "raw/{}/{}.ndjson",
            run_date.format("%Y%m%d"),
            self.file_stem()
        )
    }

    /// Key pattern matching this purpose across every staged run date.
    #[must_use]
    pub fn all_dates_pattern(&self) -> String {
        format!("raw/*/{}.ndjson", self.file_stem())
    }
}

impl fmt::Display for BatchPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_stem())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cik_padding() {
        assert_eq!(Cik::from_raw(789019).as_str(), "0000789019");
        assert_eq!(Cik::new("320193").as_str(), "0000320193");
        assert_eq!(Cik::new("0000320193").as_str(), "0000320193");
        assert_eq!(Cik::from(1u64).as_str().len(), CIK_WIDTH);
    }

    #[test]
    fn test_ticker_creation() {
        let ticker = Ticker::new(" aapl ");
        assert_eq!(ticker.as_str(), "AAPL");
        assert_eq!(ticker, Ticker::from("AAPL"));
        assert!(Ticker::new("  ").is_empty());
    }

    #[test]
    fn test_object_keys() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(
            BatchPurpose::CompanyFacts.object_key(date),
            "raw/20240307/companyfacts.ndjson"
        );
        assert_eq!(
            BatchPurpose::Submissions.object_key(date),
            "raw/20240307/submissions.ndjson"
        );
        assert_eq!(
            BatchPurpose::Submissions.all_dates_pattern(),
            "raw/*/submissions.ndjson"
        );
        assert_eq!(BatchPurpose::CompanyFacts.raw_table(), "raw_companyfacts");
    }

    #[test]
    fn test_fact_row_serializes_flat() {
        let row = FactRow {
            cik: Cik::from_raw(320193),
            ticker: Ticker::new("AAPL"),
            concept: "us-gaap:Revenues".to_string(),
            unit: "USD".to_string(),
            period_end_date: "2023-12-31".to_string(),
            val: Some(Number::from(1_000_000)),
            accn: None,
            fy: Some(2023),
            fp: Some("FY".to_string()),
            form: None,
            filed: None,
        };

        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["cik"], "0000320193");
        assert_eq!(json["ticker"], "AAPL");
        assert_eq!(json["val"], 1_000_000);
        assert!(json["accn"].is_null());
    }
}
