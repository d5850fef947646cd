#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/filings/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Ingestion pipeline for SEC EDGAR financials.
//!
//! This crate ties the pipeline crates together. It re-exports the core types,
//! the EDGAR client, the staging sink and object stores and the warehouse, and
//! provides [`IngestPipeline`] which runs one ingestion batch end to end.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use filings::{EdgarClient, IngestPipeline, LocalObjectStore, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> filings::Result<()> {
//!     let config = PipelineConfig::new(["AAPL", "MSFT"]).with_bucket("staging");
//!     let store = Arc::new(LocalObjectStore::new(config.bucket()?));
//!     let source = Arc::new(EdgarClient::new(&config.user_agent)?);
//!
//!     let batch = IngestPipeline::new(config, source, store).run().await?;
//!     println!("staged {} fact rows", batch.facts.rows);
//!
//!     Ok(())
//! }
//! ```

// Core types and traits
pub use filings_core::*;

// EDGAR access and normalization
pub use filings_edgar::{
    ConceptSelection, EdgarClient, SelectionTier, TickerDirectory, flatten_submissions,
    normalize_company_facts, select_concepts,
};

// Staging
pub use filings_stage::{InMemoryObjectStore, LocalObjectStore, NdjsonSink, StagedObject};

// Warehouse
pub use filings_warehouse::{
    LoadJob, LoadOptions, QualityChecker, SqliteWarehouse, ValidationReport,
};

mod pipeline;
pub use pipeline::{CollectedRows, CompanySummary, IngestPipeline, StagedBatch};
