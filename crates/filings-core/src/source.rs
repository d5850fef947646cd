//! Trait for retrieving filings data.
//!
//! [`FilingSource`] is the read side of the regulatory API: the ticker
//! directory plus the two per-company documents. The production
//! implementation is `EdgarClient`; tests substitute scripted sources.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    documents::{CompanyFacts, CompanySubmissions, TickerEntry},
    error::Result,
    types::Cik,
};

/// Source of ticker, submissions and company-facts documents.
///
/// Every method is a single request; a failure aborts the caller's run.
#[async_trait]
pub trait FilingSource: Send + Sync + Debug {
    /// Returns the name of this source (e.g., "SEC EDGAR").
    fn name(&self) -> &str;

    /// Fetches the ticker directory, in the order the source lists it.
    async fn ticker_directory(&self) -> Result<Vec<TickerEntry>>;

    /// Fetches the filing history document for a company.
    async fn company_submissions(&self, cik: &Cik) -> Result<CompanySubmissions>;

    /// Fetches the XBRL company facts document for a company.
    async fn company_facts(&self, cik: &Cik) -> Result<CompanyFacts>;
}
