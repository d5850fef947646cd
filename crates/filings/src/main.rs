//! `filings` command-line entry point.
//!
//! Each subcommand is one stage of the pipeline and runs as its own process;
//! the exit status is the only success signal.

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use filings::{
    BatchPurpose, EdgarClient, IngestPipeline, LoadOptions, LocalObjectStore, PipelineConfig,
    QualityChecker, Result, SqliteWarehouse,
};

#[derive(Debug, Parser)]
#[command(
    name = "filings",
    version,
    about = "Stage SEC EDGAR financials and load them into the warehouse"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch configured companies from EDGAR and stage the run's batch
    Ingest,
    /// Append every staged batch to the raw warehouse tables
    Load,
    /// Evaluate data quality expectations on the curated facts table
    Check,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Run failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> Result<()> {
    let config = PipelineConfig::from_env()?;
    match command {
        Command::Ingest => ingest(config).await,
        Command::Load => load(&config).await,
        Command::Check => check(&config),
    }
}

async fn ingest(config: PipelineConfig) -> Result<()> {
    // Checked before the first request goes out.
    let store = Arc::new(LocalObjectStore::new(config.bucket()?));
    let source = Arc::new(EdgarClient::new(&config.user_agent)?);

    let batch = IngestPipeline::new(config, source, store).run().await?;
    for company in &batch.companies {
        info!(
            ticker = %company.ticker,
            cik = %company.cik,
            facts = company.fact_rows,
            submissions = company.submission_rows,
            "Company summary"
        );
    }
    info!(
        facts = batch.facts.rows,
        submissions = batch.submissions.rows,
        "Run succeeded"
    );
    Ok(())
}

async fn load(config: &PipelineConfig) -> Result<()> {
    let store = LocalObjectStore::new(config.bucket()?);
    let warehouse = SqliteWarehouse::open(config.warehouse.clone())?;

    for purpose in BatchPurpose::ALL {
        let job = warehouse
            .load_ndjson(
                &store,
                purpose.raw_table(),
                &purpose.all_dates_pattern(),
                &LoadOptions::default(),
            )
            .await?;
        info!(
            destination = %job.destination,
            files = job.source_uris.len(),
            rows = job.rows_loaded,
            location = %job.location,
            "Loaded"
        );
    }
    Ok(())
}

fn check(config: &PipelineConfig) -> Result<()> {
    let warehouse = SqliteWarehouse::open(config.warehouse.clone())?;
    let report = QualityChecker::new(&warehouse).run()?;
    if !report.success {
        warn!(
            failed = report.statistics.unsuccessful,
            evaluated = report.statistics.evaluated,
            "Data quality expectations not met"
        );
    }
    Ok(())
}
