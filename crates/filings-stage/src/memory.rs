//! In-memory object store implementation.

use async_trait::async_trait;
use filings_core::store::validate_key;
use filings_core::{FilingsError, ObjectStore, Result};
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// Simple in-memory bucket for testing and dry runs.
///
/// Objects are stored in a `RwLock`-protected `BTreeMap`, so listings come
/// back sorted, and are lost when the store is dropped.
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    bucket: String,
    objects: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryObjectStore {
    /// Create a new empty bucket.
    #[must_use]
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: RwLock::default(),
        }
    }

    /// Number of stored objects.
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    /// Returns true if nothing has been stored.
    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn uri(&self, key: &str) -> String {
        format!("mem://{}/{}", self.bucket, key)
    }

    #[instrument(skip(self, data), fields(bucket = %self.bucket, bytes = data.len()))]
    async fn put(&self, key: &str, data: Vec<u8>) -> Result<()> {
        validate_key(key)?;
        self.objects.write().await.insert(key.to_string(), data);
        debug!("Stored object");
        Ok(())
    }

    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        validate_key(key)?;
        self.objects
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| FilingsError::Storage(format!("No such object: {}", self.uri(key))))
    }

    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let objects = self.objects.read().await;
        let keys: Vec<String> = objects
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect();
        debug!(count = keys.len(), "Listed objects");
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_overwrite() {
        let store = InMemoryObjectStore::new("staging");
        assert!(store.is_empty().await);

        store.put("raw/20240101/a.ndjson", b"one".to_vec()).await.unwrap();
        store.put("raw/20240101/a.ndjson", b"two".to_vec()).await.unwrap();

        assert_eq!(store.len().await, 1);
        assert_eq!(store.get("raw/20240101/a.ndjson").await.unwrap(), b"two");
        assert_eq!(store.uri("k"), "mem://staging/k");
    }

    #[tokio::test]
    async fn test_missing_object() {
        let store = InMemoryObjectStore::new("staging");
        assert!(matches!(
            store.get("raw/none.ndjson").await,
            Err(FilingsError::Storage(_))
        ));
    }

    #[tokio::test]
    async fn test_list_by_prefix() {
        let store = InMemoryObjectStore::new("staging");
        for key in [
            "raw/20240102/submissions.ndjson",
            "raw/20240101/companyfacts.ndjson",
            "other/x.ndjson",
        ] {
            store.put(key, Vec::new()).await.unwrap();
        }

        assert_eq!(
            store.list("raw/").await.unwrap(),
            vec![
                "raw/20240101/companyfacts.ndjson".to_string(),
                "raw/20240102/submissions.ndjson".to_string(),
            ]
        );
        assert_eq!(store.list("").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_rejects_bad_keys() {
        let store = InMemoryObjectStore::new("staging");
        assert!(store.put("../escape", Vec::new()).await.is_err());
    }
}
