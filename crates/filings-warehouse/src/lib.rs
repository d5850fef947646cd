#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/filings/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Warehouse load and quality checks for staged filings batches.
//!
//! - [`SqliteWarehouse`] - Append-only bulk loader for raw tables
//! - [`QualityChecker`] - Informational expectations over the curated table

/// Append loads of staged NDJSON objects.
pub mod loader;
/// Post-load data quality expectations.
pub mod quality;
/// Schema auto-detection for NDJSON records.
pub mod schema;

pub use loader::{LoadJob, LoadOptions, SqliteWarehouse};
pub use quality::{
    CURATED_FACTS_TABLE, DEFAULT_ROW_LIMIT, Expectation, ExpectationResult, QualityChecker,
    ValidationReport, ValidationStatistics,
};
pub use schema::{ColumnDef, ColumnType, infer_schema};
