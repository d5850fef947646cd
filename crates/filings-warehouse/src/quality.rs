//! Informational expectations over the curated facts table.
//!
//! A check never blocks the pipeline: failed expectations are reported, not
//! raised. Only an unreadable table is an error.

use crate::loader::SqliteWarehouse;
use crate::schema::quote_ident;
use filings_core::Result;
use polars::prelude::*;
use std::fmt;
use tracing::{info, instrument, warn};

/// Curated table materialized downstream of the raw loads.
pub const CURATED_FACTS_TABLE: &str = "fct_financials_quarterly";

/// Columns read from the curated table.
const CHECKED_COLUMNS: [&str; 4] = ["cik", "concept", "period_end_date", "value"];

/// Rows sampled per check.
pub const DEFAULT_ROW_LIMIT: usize = 1000;

/// A single assertion about a column.
#[derive(Clone, Debug, PartialEq)]
pub enum Expectation {
    /// Every value in the column is present.
    NotNull(String),
    /// The column has the given type.
    OfType {
        /// Column to inspect.
        column: String,
        /// Required type.
        dtype: DataType,
    },
}

impl Expectation {
    /// Expect `column` to hold no nulls.
    pub fn not_null(column: impl Into<String>) -> Self {
        Self::NotNull(column.into())
    }

    /// Expect `column` to have type `dtype`.
    pub fn of_type(column: impl Into<String>, dtype: DataType) -> Self {
        Self::OfType {
            column: column.into(),
            dtype,
        }
    }

    /// The three checks run against the curated facts table.
    #[must_use]
    pub fn curated_defaults() -> Vec<Self> {
        vec![
            Self::not_null("period_end_date"),
            Self::not_null("concept"),
            Self::of_type("value", DataType::Float64),
        ]
    }

    /// Column the expectation is about.
    #[must_use]
    pub fn column(&self) -> &str {
        match self {
            Self::NotNull(column) | Self::OfType { column, .. } => column,
        }
    }

    /// Evaluates the expectation against `df`.
    ///
    /// A missing column fails the expectation with every row unexpected.
    #[must_use]
    pub fn evaluate(&self, df: &DataFrame) -> ExpectationResult {
        let rows = df.height();
        let (success, unexpected_count, observed) = match df.column(self.column()) {
            Err(_) => (false, rows, "column missing".to_string()),
            Ok(column) => match self {
                Self::NotNull(_) => {
                    let nulls = column.null_count();
                    (nulls == 0, nulls, format!("{nulls} null of {rows}"))
                }
                Self::OfType { dtype, .. } => {
                    let matches = column.dtype() == dtype;
                    (matches, if matches { 0 } else { rows }, column.dtype().to_string())
                }
            },
        };

        ExpectationResult {
            expectation: self.to_string(),
            success,
            unexpected_count,
            observed,
        }
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotNull(column) => write!(f, "expect_column_values_to_not_be_null({column})"),
            Self::OfType { column, dtype } => {
                write!(f, "expect_column_values_to_be_of_type({column}, {dtype})")
            }
        }
    }
}

/// Outcome of one expectation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExpectationResult {
    /// Which expectation was evaluated.
    pub expectation: String,
    /// Whether it held.
    pub success: bool,
    /// Number of rows that violated it.
    pub unexpected_count: usize,
    /// What was observed, for the log.
    pub observed: String,
}

/// Totals across a report.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ValidationStatistics {
    /// Expectations evaluated.
    pub evaluated: usize,
    /// Expectations that held.
    pub successful: usize,
    /// Expectations that failed.
    pub unsuccessful: usize,
    /// Share that held, in percent. `None` when nothing was evaluated.
    pub success_percent: Option<f64>,
}

impl ValidationStatistics {
    fn from_results(results: &[ExpectationResult]) -> Self {
        let evaluated = results.len();
        let successful = results.iter().filter(|r| r.success).count();
        let success_percent =
            (evaluated > 0).then(|| successful as f64 * 100.0 / evaluated as f64);
        Self {
            evaluated,
            successful,
            unsuccessful: evaluated - successful,
            success_percent,
        }
    }
}

/// Result of a quality check run.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidationReport {
    /// True if every expectation held.
    pub success: bool,
    /// Totals.
    pub statistics: ValidationStatistics,
    /// One entry per expectation, in evaluation order.
    pub results: Vec<ExpectationResult>,
    /// Rows sampled from the table.
    pub rows_checked: usize,
}

impl ValidationReport {
    /// Evaluates `expectations` against `df`.
    #[must_use]
    pub fn evaluate(df: &DataFrame, expectations: &[Expectation]) -> Self {
        let results: Vec<ExpectationResult> = expectations.iter().map(|e| e.evaluate(df)).collect();
        let statistics = ValidationStatistics::from_results(&results);
        Self {
            success: statistics.unsuccessful == 0,
            statistics,
            results,
            rows_checked: df.height(),
        }
    }
}

/// Samples the curated facts table and evaluates expectations on it.
#[derive(Debug)]
pub struct QualityChecker<'a> {
    warehouse: &'a SqliteWarehouse,
    table: String,
    limit: usize,
    expectations: Vec<Expectation>,
}

impl<'a> QualityChecker<'a> {
    /// Checker for [`CURATED_FACTS_TABLE`] in the curated dataset with the
    /// default expectations.
    #[must_use]
    pub fn new(warehouse: &'a SqliteWarehouse) -> Self {
        Self {
            warehouse,
            table: CURATED_FACTS_TABLE.to_string(),
            limit: DEFAULT_ROW_LIMIT,
            expectations: Expectation::curated_defaults(),
        }
    }

    /// Check a different table of the curated dataset.
    #[must_use]
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Sample at most `limit` rows.
    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Replace the expectations.
    #[must_use]
    pub fn with_expectations(mut self, expectations: Vec<Expectation>) -> Self {
        self.expectations = expectations;
        self
    }

    /// Reads the sample and evaluates every expectation.
    ///
    /// # Errors
    /// Returns an error if the table cannot be read. Failed expectations are
    /// reported in the result, not as errors.
    #[instrument(skip(self), fields(table = %self.table))]
    pub fn run(&self) -> Result<ValidationReport> {
        let dataset = &self.warehouse.config().curated_dataset;
        let columns: Vec<String> = CHECKED_COLUMNS.iter().map(|c| quote_ident(c)).collect();
        let sql = format!(
            "SELECT {} FROM {}.{} LIMIT ?1",
            columns.join(", "),
            quote_ident(dataset),
            quote_ident(&self.table)
        );
        let limit = i64::try_from(self.limit).unwrap_or(i64::MAX);
        let df = self.warehouse.query_frame(&sql, [limit])?;

        let report = ValidationReport::evaluate(&df, &self.expectations);
        for result in &report.results {
            if result.success {
                info!(expectation = %result.expectation, observed = %result.observed, "Expectation met");
            } else {
                warn!(
                    expectation = %result.expectation,
                    unexpected = result.unexpected_count,
                    observed = %result.observed,
                    "Expectation failed"
                );
            }
        }
        info!(
            success = report.success,
            rows = report.rows_checked,
            evaluated = report.statistics.evaluated,
            successful = report.statistics.successful,
            "Quality check complete"
        );
        Ok(report)
    }
}
