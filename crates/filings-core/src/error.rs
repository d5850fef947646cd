//! Error types for pipeline operations.
//!
//! This module defines [`FilingsError`] which covers every failure that can
//! abort a run: network and HTTP failures, parse errors, staging and warehouse
//! failures, configuration problems and structural anomalies in upstream data.
//! Missing or partial data is never an error; it degrades to empty results.

use thiserror::Error;

/// Errors that can occur while ingesting, staging or loading filings data.
#[derive(Error, Debug)]
pub enum FilingsError {
    /// Network-related errors (connection failures, timeouts, etc.).
    #[error("Network error: {0}")]
    Network(String),

    /// The API answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Http {
        /// Requested URL.
        url: String,
        /// Returned status code.
        status: u16,
    },

    /// Error parsing data from the API or a staged file.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Error reading or writing staged objects.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Error interacting with the warehouse.
    #[error("Warehouse error: {0}")]
    Warehouse(String),

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A submissions document whose parallel arrays cannot be zipped.
    #[error("Malformed submissions for {ticker}: {detail}")]
    MalformedSubmissions {
        /// Ticker whose document is malformed.
        ticker: String,
        /// What was wrong with it.
        detail: String,
    },

    /// An invalid parameter was provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Local filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using [`FilingsError`].
pub type Result<T> = std::result::Result<T, FilingsError>;
