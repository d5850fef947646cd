#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/filings/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core traits and types for the SEC filings pipeline.
//!
//! This crate provides the foundational abstractions shared by every stage:
//!
//! - [`FilingSource`](source::FilingSource) - Read side of the regulatory API
//! - [`ObjectStore`](store::ObjectStore) - Durable staging storage
//! - [`FactRow`](types::FactRow) / [`SubmissionRow`](types::SubmissionRow) - Flat output records
//! - [`PipelineConfig`](config::PipelineConfig) - Explicit run configuration

/// Run and warehouse configuration.
pub mod config;
/// EDGAR API response documents.
pub mod documents;
/// Error types for pipeline operations.
pub mod error;
/// Trait for retrieving filings data.
pub mod source;
/// Trait for staging objects in durable storage.
pub mod store;
/// Core data types (Cik, Ticker, rows, batch purposes).
pub mod types;

// Re-export commonly used items at crate root
pub use config::{PipelineConfig, WarehouseConfig};
pub use documents::{CompanyFacts, CompanySubmissions, FilingHistory, RecentFilings, TickerEntry};
pub use error::{FilingsError, Result};
pub use source::FilingSource;
pub use store::ObjectStore;
pub use types::{BatchPurpose, Cik, FactRow, SubmissionRow, Ticker};
