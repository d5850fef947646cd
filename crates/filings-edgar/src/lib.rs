#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/filings/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! SEC EDGAR provider for the filings pipeline.
//!
//! This crate provides access to SEC EDGAR including:
//!
//! - CIK (Central Index Key) lookup from ticker symbols
//! - Company facts and submissions from the EDGAR API
//! - XBRL fact flattening with tiered concept selection
//! - Recent filing history flattening
//!
//! # Example
//!
//! ```no_run
//! use filings_core::{FilingSource, Ticker};
//! use filings_edgar::{EdgarClient, TickerDirectory, normalize_company_facts};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = EdgarClient::new("MyApp/1.0 (contact@example.com)")?;
//!
//!     let directory = TickerDirectory::from_entries(client.ticker_directory().await?);
//!     let ticker = Ticker::new("AAPL");
//!     if let Some(cik) = directory.lookup(&ticker) {
//!         let facts = client.company_facts(cik).await?;
//!         let rows = normalize_company_facts(cik, &ticker, &facts);
//!         println!("{} fact rows for {}", rows.len(), ticker);
//!     }
//!
//!     Ok(())
//! }
//! ```

mod client;
pub mod facts;
mod resolver;
mod submissions;

pub use client::EdgarClient;
pub use facts::{
    ConceptSelection, PREFERRED_CONCEPTS, SelectionTier, available_concepts, fact_rows,
    normalize_company_facts, observation_period, select_concepts,
};
pub use resolver::TickerDirectory;
pub use submissions::flatten_submissions;
