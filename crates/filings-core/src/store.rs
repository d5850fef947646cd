//! Trait for staging objects in durable storage.
//!
//! This module defines the [`ObjectStore`] trait, a minimal bucket interface
//! used by the NDJSON sink to upload staged batches and by the bulk loader to
//! read them back.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::error::{FilingsError, Result};

/// A flat bucket of objects addressed by `/`-separated keys.
///
/// Writes to an existing key replace it (last writer wins).
#[async_trait]
pub trait ObjectStore: Send + Sync + Debug {
    /// Name of the bucket this store writes to.
    fn bucket(&self) -> &str;

    /// Fully qualified URI of `key`, used in logs and load job reports.
    fn uri(&self, key: &str) -> String;

    /// Stores `data` under `key`, replacing any previous object.
    async fn put(&self, key: &str, data: Vec<u8>) -> Result<()>;

    /// Reads the object stored under `key`.
    ///
    /// Returns a [`FilingsError::Storage`] error if the key does not exist.
    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Lists keys starting with `prefix`, sorted ascending.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
}

/// Validates an object key.
///
/// Keys must be non-empty, relative, and free of `.`/`..` or empty segments.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() || key.starts_with('/') {
        return Err(FilingsError::Storage(format!("Invalid object key: {key:?}")));
    }
    if key
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(FilingsError::Storage(format!("Invalid object key: {key:?}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("raw/20240101/companyfacts.ndjson").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("/raw/x.ndjson").is_err());
        assert!(validate_key("raw/../etc/passwd").is_err());
        assert!(validate_key("raw//x.ndjson").is_err());
    }
}
