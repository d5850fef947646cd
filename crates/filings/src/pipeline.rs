//! One ingestion batch, from ticker resolution to staged objects.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, instrument, warn};

use filings_core::{
    BatchPurpose, Cik, FactRow, FilingSource, ObjectStore, PipelineConfig, Result, SubmissionRow,
    Ticker,
};
use filings_edgar::{TickerDirectory, flatten_submissions, normalize_company_facts};
use filings_stage::{NdjsonSink, StagedObject};

/// Rows collected for one company.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompanySummary {
    /// Ticker as configured.
    pub ticker: Ticker,
    /// Resolved CIK.
    pub cik: Cik,
    /// Fact rows produced.
    pub fact_rows: usize,
    /// Submission rows produced.
    pub submission_rows: usize,
}

/// Everything gathered for a batch before staging.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CollectedRows {
    /// Fact rows of every company, in processing order.
    pub facts: Vec<FactRow>,
    /// Submission rows of every company, in processing order.
    pub submissions: Vec<SubmissionRow>,
    /// Per-company counts.
    pub companies: Vec<CompanySummary>,
    /// Configured tickers missing from the directory.
    pub skipped: Vec<Ticker>,
}

/// Summary of a completed ingestion run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StagedBatch {
    /// Date partition the batch was staged under.
    pub run_date: NaiveDate,
    /// The staged fact rows file.
    pub facts: StagedObject,
    /// The staged submission rows file.
    pub submissions: StagedObject,
    /// Per-company counts.
    pub companies: Vec<CompanySummary>,
    /// Configured tickers missing from the directory.
    pub skipped: Vec<Ticker>,
}

/// Runs ingestion batches against a filing source and an object store.
///
/// Companies are processed one at a time in configured order, with a fixed
/// pause between them. Any request failure aborts the whole batch and
/// nothing is staged.
#[derive(Debug)]
pub struct IngestPipeline {
    config: PipelineConfig,
    source: Arc<dyn FilingSource>,
    sink: NdjsonSink,
}

impl IngestPipeline {
    /// Create a pipeline staging into `store` through `config.staging_dir`.
    pub fn new(
        config: PipelineConfig,
        source: Arc<dyn FilingSource>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        let sink = NdjsonSink::new(config.staging_dir.clone(), store);
        Self {
            config,
            source,
            sink,
        }
    }

    /// Configuration of this pipeline.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Resolves, fetches and flattens every configured company.
    ///
    /// # Errors
    /// Returns the first request failure or malformed submissions document.
    #[instrument(skip(self), fields(source = self.source.name()))]
    pub async fn collect(&self) -> Result<CollectedRows> {
        let directory = TickerDirectory::from_entries(self.source.ticker_directory().await?);
        debug!(entries = directory.len(), "Loaded ticker directory");

        let mut collected = CollectedRows::default();
        for ticker in &self.config.tickers {
            let Some(cik) = directory.lookup(ticker).cloned() else {
                warn!(%ticker, "Ticker not found in directory, skipping");
                collected.skipped.push(ticker.clone());
                continue;
            };

            if !collected.companies.is_empty() && !self.config.request_pause.is_zero() {
                tokio::time::sleep(self.config.request_pause).await;
            }

            info!(%ticker, %cik, "Processing company");
            let submissions = self.source.company_submissions(&cik).await?;
            let facts = self.source.company_facts(&cik).await?;

            let submission_rows = flatten_submissions(&cik, ticker, &submissions)?;
            let fact_rows = normalize_company_facts(&cik, ticker, &facts);
            info!(
                %ticker,
                facts = fact_rows.len(),
                submissions = submission_rows.len(),
                "Collected company rows"
            );

            collected.companies.push(CompanySummary {
                ticker: ticker.clone(),
                cik,
                fact_rows: fact_rows.len(),
                submission_rows: submission_rows.len(),
            });
            collected.facts.extend(fact_rows);
            collected.submissions.extend(submission_rows);
        }

        Ok(collected)
    }

    /// Collects every company and stages both files of the batch.
    ///
    /// # Errors
    /// Returns an error if collection, the local write, or the upload fails.
    pub async fn run(&self) -> Result<StagedBatch> {
        let collected = self.collect().await?;
        let run_date = self.config.run_date;

        let facts = self
            .sink
            .stage(run_date, BatchPurpose::CompanyFacts, &collected.facts)
            .await?;
        let submissions = self
            .sink
            .stage(run_date, BatchPurpose::Submissions, &collected.submissions)
            .await?;

        info!(
            %run_date,
            companies = collected.companies.len(),
            skipped = collected.skipped.len(),
            facts = facts.rows,
            submissions = submissions.rows,
            "Batch staged"
        );

        Ok(StagedBatch {
            run_date,
            facts,
            submissions,
            companies: collected.companies,
            skipped: collected.skipped,
        })
    }
}
