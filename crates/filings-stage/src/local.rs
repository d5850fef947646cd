//! Directory-backed object store implementation.

use async_trait::async_trait;
use filings_core::store::validate_key;
use filings_core::{FilingsError, ObjectStore, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Bucket stored as files under a root directory.
///
/// Object keys map to relative paths below the root, so
/// `raw/20240101/companyfacts.ndjson` lands at
/// `<root>/raw/20240101/companyfacts.ndjson`.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    bucket: String,
}

impl LocalObjectStore {
    /// Create a store rooted at `root`. The directory is created on first write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let bucket = root.display().to_string();
        Self { root, bucket }
    }

    /// Root directory of the bucket.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(key.split('/').fold(self.root.clone(), |path, segment| path.join(segment)))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn uri(&self, key: &str) -> String {
        format!("file://{}/{}", self.bucket.trim_end_matches('/'), key)
    }

    #[instrument(skip(self, data), fields(bucket = %self.bucket, bytes = data.len()))]
    async fn put(&self, key: &str, data: Vec<u8>) -> Result<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, data).await?;
        debug!(path = %path.display(), "Stored object");
        Ok(())
    }

    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.path_for(key)?;
        tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => FilingsError::Storage(format!("No such object: {}", self.uri(key))),
            _ => FilingsError::Io(e),
        })
    }

    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let root = self.root.clone();
        let mut keys = tokio::task::spawn_blocking(move || walk_keys(&root))
            .await
            .map_err(|e| FilingsError::Storage(format!("Listing task failed: {e}")))??;
        keys.retain(|key| key.starts_with(prefix));
        keys.sort();
        debug!(count = keys.len(), "Listed objects");
        Ok(keys)
    }
}

/// Collects every file below `root` as a `/`-separated key.
fn walk_keys(root: &Path) -> Result<Vec<String>> {
    let mut keys = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            // An unwritten bucket is an empty bucket.
            Err(e) if e.kind() == ErrorKind::NotFound => continue,
            Err(e) => return Err(e.into()),
        };

        for entry in entries {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if let Ok(relative) = path.strip_prefix(root) {
                let key: Vec<String> = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect();
                keys.push(key.join("/"));
            }
        }
    }

    Ok(keys)
}
