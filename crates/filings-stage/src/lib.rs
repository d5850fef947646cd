#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/filings/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Staging implementations for the filings pipeline.
//!
//! This crate provides implementations of the [`ObjectStore`] trait from `filings-core`:
//!
//! - [`LocalObjectStore`] - Bucket backed by a local directory
//! - [`InMemoryObjectStore`] - Bucket held in memory, for testing
//!
//! and the [`NdjsonSink`] that stages row batches into them.

/// Directory-backed object store.
pub mod local;
/// In-memory object store.
pub mod memory;
/// NDJSON encoding and the staging sink.
pub mod ndjson;

// Re-export the trait for convenience
pub use filings_core::ObjectStore;

// Re-export implementations
pub use local::LocalObjectStore;
pub use memory::InMemoryObjectStore;
pub use ndjson::{NdjsonSink, StagedObject, decode_ndjson, read_ndjson, write_ndjson};
