//! Run and warehouse configuration.
//!
//! Configuration is read once at startup into an explicit [`PipelineConfig`]
//! that is passed to every stage. [`PipelineConfig::from_lookup`] takes the
//! variable source as a closure so tests never touch the process environment.

use chrono::{NaiveDate, Utc};
use std::path::PathBuf;
use std::time::Duration;

use crate::{
    error::{FilingsError, Result},
    types::Ticker,
};

/// Tickers processed when `TICKERS` is unset.
pub const DEFAULT_TICKERS: &str = "AAPL,MSFT";

/// User agent sent when `SEC_USER_AGENT` is unset.
pub const DEFAULT_USER_AGENT: &str = "filings-pipeline/0.1 (ops@example.com)";

/// Courtesy pause between companies.
pub const DEFAULT_REQUEST_PAUSE: Duration = Duration::from_millis(300);

/// Configuration for one pipeline invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Tickers to ingest, uppercased, in processing order.
    pub tickers: Vec<Ticker>,
    /// Identifying user agent sent to the SEC.
    pub user_agent: String,
    /// Destination bucket for staged batches.
    pub bucket: Option<String>,
    /// Local directory staged files are written to before upload.
    pub staging_dir: PathBuf,
    /// Fixed pause between companies.
    pub request_pause: Duration,
    /// Date partition of this run's staged batch.
    pub run_date: NaiveDate,
    /// Warehouse settings for load and quality checks.
    pub warehouse: WarehouseConfig,
}

/// Warehouse location and dataset names.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WarehouseConfig {
    /// Project identifier; names the warehouse database.
    pub project: String,
    /// Dataset holding the raw tables.
    pub raw_dataset: String,
    /// Dataset holding the curated tables read by quality checks.
    pub curated_dataset: String,
    /// Region label recorded on load jobs.
    pub location: String,
    /// Directory the warehouse database files live in.
    pub root: PathBuf,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            project: "sec-edgar-financials-warehouse".to_string(),
            raw_dataset: "sec_raw".to_string(),
            curated_dataset: "sec_curated_sec_curated".to_string(),
            location: "US".to_string(),
            root: PathBuf::from("warehouse"),
        }
    }
}

impl PipelineConfig {
    /// Creates a configuration for `tickers` with every other setting defaulted.
    #[must_use]
    pub fn new(tickers: impl IntoIterator<Item = impl Into<Ticker>>) -> Self {
        Self {
            tickers: tickers.into_iter().map(Into::into).collect(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            bucket: None,
            staging_dir: PathBuf::from("tmp"),
            request_pause: DEFAULT_REQUEST_PAUSE,
            run_date: Utc::now().date_naive(),
            warehouse: WarehouseConfig::default(),
        }
    }

    /// Sets the destination bucket.
    #[must_use]
    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    /// Sets the local staging directory.
    #[must_use]
    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = dir.into();
        self
    }

    /// Sets the pause between companies.
    #[must_use]
    pub const fn with_request_pause(mut self, pause: Duration) -> Self {
        self.request_pause = pause;
        self
    }

    /// Sets the run date partition.
    #[must_use]
    pub const fn with_run_date(mut self, run_date: NaiveDate) -> Self {
        self.run_date = run_date;
        self
    }

    /// Loads configuration from the process environment, reading `.env` first.
    ///
    /// # Errors
    /// Returns [`FilingsError::Config`] if a variable is present but malformed.
    pub fn from_env() -> Result<Self> {
        // A missing .env file is normal in deployed environments.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset.
    ///
    /// # Errors
    /// Returns [`FilingsError::Config`] if a variable is present but malformed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let tickers = parse_tickers(&var("TICKERS").unwrap_or_else(|| DEFAULT_TICKERS.to_string()));

        let request_pause = match var("REQUEST_PAUSE_MS") {
            Some(ms) => Duration::from_millis(ms.trim().parse().map_err(|e| {
                FilingsError::Config(format!("REQUEST_PAUSE_MS must be milliseconds: {e}"))
            })?),
            None => DEFAULT_REQUEST_PAUSE,
        };

        let run_date = match var("RUN_DATE") {
            Some(date) => NaiveDate::parse_from_str(date.trim(), "%Y%m%d").map_err(|e| {
                FilingsError::Config(format!("RUN_DATE must be YYYYMMDD: {e}"))
            })?,
            None => Utc::now().date_naive(),
        };

        let defaults = WarehouseConfig::default();
        let warehouse = WarehouseConfig {
            project: var("WAREHOUSE_PROJECT").unwrap_or(defaults.project),
            raw_dataset: var("WAREHOUSE_RAW_DATASET").unwrap_or(defaults.raw_dataset),
            curated_dataset: var("WAREHOUSE_CURATED_DATASET").unwrap_or(defaults.curated_dataset),
            location: var("WAREHOUSE_LOCATION").unwrap_or(defaults.location),
            root: var("WAREHOUSE_ROOT").map_or(defaults.root, PathBuf::from),
        };

        Ok(Self {
            tickers,
            user_agent: var("SEC_USER_AGENT").unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            bucket: var("STAGING_BUCKET"),
            staging_dir: var("STAGING_DIR").map_or_else(|| PathBuf::from("tmp"), PathBuf::from),
            request_pause,
            run_date,
            warehouse,
        })
    }

    /// Returns the destination bucket.
    ///
    /// # Errors
    /// Returns [`FilingsError::Config`] if no bucket is configured.
    pub fn bucket(&self) -> Result<&str> {
        self.bucket
            .as_deref()
            .ok_or_else(|| FilingsError::Config("STAGING_BUCKET is not set".to_string()))
    }
}

/// Splits a comma-separated ticker list, dropping blanks.
fn parse_tickers(raw: &str) -> Vec<Ticker> {
    raw.split(',')
        .map(Ticker::new)
        .filter(|t| !t.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.tickers, vec![Ticker::new("AAPL"), Ticker::new("MSFT")]);
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.request_pause, DEFAULT_REQUEST_PAUSE);
        assert_eq!(config.staging_dir, PathBuf::from("tmp"));
        assert_eq!(config.warehouse, WarehouseConfig::default());
        assert!(config.bucket.is_none());
    }

    #[test]
    fn test_missing_bucket_is_config_error() {
        let config = PipelineConfig::from_lookup(lookup(&[("STAGING_BUCKET", "  ")])).unwrap();
        assert!(matches!(config.bucket(), Err(FilingsError::Config(_))));
    }

    #[test]
    fn test_overrides() {
        let config = PipelineConfig::from_lookup(lookup(&[
            ("TICKERS", " nvda, ,brk-b "),
            ("STAGING_BUCKET", "staging"),
            ("REQUEST_PAUSE_MS", "0"),
            ("RUN_DATE", "20240102"),
            ("WAREHOUSE_RAW_DATASET", "raw_test"),
        ]))
        .unwrap();

        assert_eq!(config.tickers, vec![Ticker::new("NVDA"), Ticker::new("BRK-B")]);
        assert_eq!(config.bucket().unwrap(), "staging");
        assert_eq!(config.request_pause, Duration::ZERO);
        assert_eq!(config.run_date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(config.warehouse.raw_dataset, "raw_test");
        assert_eq!(config.warehouse.curated_dataset, "sec_curated_sec_curated");
    }

    #[test]
    fn test_malformed_values_are_rejected() {
        assert!(matches!(
            PipelineConfig::from_lookup(lookup(&[("REQUEST_PAUSE_MS", "soon")])),
            Err(FilingsError::Config(_))
        ));
        assert!(matches!(
            PipelineConfig::from_lookup(lookup(&[("RUN_DATE", "2024-01-02")])),
            Err(FilingsError::Config(_))
        ));
    }

    #[test]
    fn test_builder() {
        let date = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        let config = PipelineConfig::new(["aapl"])
            .with_bucket("b")
            .with_request_pause(Duration::ZERO)
            .with_run_date(date);
        assert_eq!(config.tickers, vec![Ticker::new("AAPL")]);
        assert_eq!(config.bucket().unwrap(), "b");
        assert_eq!(config.run_date, date);
    }
}
