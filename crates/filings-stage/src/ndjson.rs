//! Newline-delimited JSON encoding and the staging sink.

use chrono::NaiveDate;
use filings_core::{BatchPurpose, FilingsError, ObjectStore, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument};

/// Writes `rows` to `path`, one JSON object per line, creating parent
/// directories as needed. An existing file is replaced.
///
/// # Errors
/// Returns an error if the file cannot be written or a row cannot be serialized.
pub fn write_ndjson<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(File::create(path)?);
    for row in rows {
        serde_json::to_writer(&mut writer, row)
            .map_err(|e| FilingsError::Parse(format!("Failed to encode row: {e}")))?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// Reads rows back from newline-delimited JSON. Blank lines are ignored.
///
/// # Errors
/// Returns [`FilingsError::Parse`] naming the first line that fails to decode.
pub fn read_ndjson<T: DeserializeOwned, R: BufRead>(reader: R) -> Result<Vec<T>> {
    let mut rows = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let row = serde_json::from_str(&line)
            .map_err(|e| FilingsError::Parse(format!("Line {}: {e}", index + 1)))?;
        rows.push(row);
    }
    Ok(rows)
}

/// Decodes an in-memory NDJSON object.
///
/// # Errors
/// See [`read_ndjson`].
pub fn decode_ndjson<T: DeserializeOwned>(bytes: &[u8]) -> Result<Vec<T>> {
    read_ndjson(bytes)
}

/// One staged file of a batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StagedObject {
    /// Which half of the batch this is.
    pub purpose: BatchPurpose,
    /// Object key in the destination bucket.
    pub key: String,
    /// Fully qualified URI of the uploaded object.
    pub uri: String,
    /// Local copy written before upload.
    pub local_path: PathBuf,
    /// Rows in the file.
    pub rows: usize,
}

/// Writes row batches to local NDJSON files and uploads them to an object store.
///
/// Local files and object keys share the layout
/// `raw/<YYYYMMDD>/<companyfacts|submissions>.ndjson`.
#[derive(Debug, Clone)]
pub struct NdjsonSink {
    staging_dir: PathBuf,
    store: Arc<dyn ObjectStore>,
}

impl NdjsonSink {
    /// Create a sink writing under `staging_dir` and uploading to `store`.
    pub fn new(staging_dir: impl Into<PathBuf>, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            staging_dir: staging_dir.into(),
            store,
        }
    }

    /// Local path of the staged file for `purpose` on `run_date`.
    #[must_use]
    pub fn local_path(&self, run_date: NaiveDate, purpose: BatchPurpose) -> PathBuf {
        purpose
            .object_key(run_date)
            .split('/')
            .fold(self.staging_dir.clone(), |path, segment| path.join(segment))
    }

    /// Serializes `rows` and uploads them as the `purpose` file of `run_date`.
    ///
    /// # Errors
    /// Returns an error if the local write or the upload fails.
    #[instrument(skip(self, rows), fields(purpose = %purpose, rows = rows.len()))]
    pub async fn stage<T: Serialize + Sync>(
        &self,
        run_date: NaiveDate,
        purpose: BatchPurpose,
        rows: &[T],
    ) -> Result<StagedObject> {
        let local_path = self.local_path(run_date, purpose);
        write_ndjson(&local_path, rows)?;

        let key = purpose.object_key(run_date);
        let data = tokio::fs::read(&local_path).await?;
        self.store.put(&key, data).await?;

        let uri = self.store.uri(&key);
        info!(%uri, "Uploaded staged file");

        Ok(StagedObject {
            purpose,
            key,
            uri,
            local_path,
            rows: rows.len(),
        })
    }
}
